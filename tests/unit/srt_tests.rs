/*!
 * Tests for reading and writing SubRip files
 */

use std::fs;
use std::path::Path;

use subtrans::document::Metadata;
use subtrans::errors::SubtitleError;
use subtrans::formats::{self, SrtFileHandler, SubtitleFileHandler};

use crate::common;

#[test]
fn test_srtFileHandler_load_fromFile_shouldReadAllEntries() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_subtitle(dir.path(), "sample.srt").unwrap();
    let content = fs::read_to_string(&path).unwrap();

    let loaded = SrtFileHandler::new().load(&content).unwrap();

    assert_eq!(loaded.format, "srt");
    assert_eq!(loaded.lines.len(), 6);
    assert_eq!(loaded.lines[0].start_ms, Some(1_000));
    assert_eq!(loaded.lines[3].start_ms, Some(90_000));
    assert_eq!(loaded.lines[5].text, "And a third.");
}

#[test]
fn test_srtFileHandler_load_withMultilineText_shouldKeepLineBreaks() {
    let content = "1\n00:00:01,000 --> 00:00:02,500\nFirst row\nSecond row\n\n2\n00:00:03,000 --> 00:00:04,000\nAlone\n";

    let loaded = SrtFileHandler::new().load(content).unwrap();

    assert_eq!(loaded.lines[0].text, "First row\nSecond row");
    assert_eq!(loaded.lines[0].end_ms, Some(2_500));
    assert_eq!(loaded.lines[1].text, "Alone");
}

#[test]
fn test_srtFileHandler_load_withMalformedEntry_shouldSkipIt() {
    common::init_logging();
    let content = "1\n00:00:01,000 --> 00:00:02,000\nKept\n\n2\nnot a timestamp\n\n3\n00:00:05,000 --> 00:00:04,000\nBackwards\n\n4\n00:00:06,000 --> 00:00:07,000\nAlso kept\n";

    let loaded = SrtFileHandler::new().load(content).unwrap();

    let texts: Vec<&str> = loaded.lines.iter().map(|line| line.text.as_str()).collect();
    assert_eq!(texts, vec!["Kept", "Also kept"]);
    assert_eq!(loaded.lines[1].number, 2);
}

#[test]
fn test_srtFileHandler_load_withZeroDuration_shouldSkipIt() {
    let content = "1\n00:00:01,000 --> 00:00:01,000\nBlink\n\n2\n00:00:02,000 --> 00:00:03,000\nSeen\n";

    let loaded = SrtFileHandler::new().load(content).unwrap();

    assert_eq!(loaded.lines.len(), 1);
    assert_eq!(loaded.lines[0].text, "Seen");
    assert_eq!(loaded.lines[0].number, 1);
}

#[test]
fn test_srtFileHandler_load_withDotMilliseconds_shouldParse() {
    let loaded = SrtFileHandler::new()
        .load("1\n00:01:02.345 --> 00:01:03.000\nDots\n")
        .unwrap();

    assert_eq!(loaded.lines[0].start_ms, Some(62_345));
}

#[test]
fn test_srtFileHandler_compose_thenLoad_shouldKeepTimingAndText() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_subtitle(dir.path(), "sample.srt").unwrap();
    let handler = SrtFileHandler::new();
    let loaded = handler.load(&fs::read_to_string(&path).unwrap()).unwrap();

    let composed = handler.compose(&loaded.lines, &Metadata::new()).unwrap();
    let output = common::create_test_file(dir.path(), "copy.srt", &composed).unwrap();
    let reloaded = handler.load(&fs::read_to_string(output).unwrap()).unwrap();

    assert!(composed.starts_with("1\n00:00:01,000 --> 00:00:04,000\nThis is a test subtitle.\n\n"));
    assert_eq!(reloaded.lines, loaded.lines);
}

#[test]
fn test_handlerForPath_withUnknownExtension_shouldFail() {
    assert!(formats::handler_for_path(Path::new("movie.SRT")).is_ok());

    let error = formats::handler_for_path(Path::new("movie.ass")).err().unwrap();

    assert!(matches!(error, SubtitleError::Parse(_)));
}
