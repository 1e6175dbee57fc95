/*!
 * Extracts translated lines and summaries from a provider response.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::SubtitleLine;
use crate::errors::TranslationError;

// Start of a line block, e.g. "#12"
static LINE_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#(\d+)[ \t]*$").expect("valid line number regex"));

static SUMMARY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<summary>(.*?)</summary>").expect("valid summary regex"));

static SCENE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<scene>(.*?)</scene>").expect("valid scene regex"));

const ORIGINAL_MARKER: &str = "Original>";
const TRANSLATION_MARKER: &str = "Translation>";

/// Lines and tags recovered from a response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTranslation {
    /// Translated lines in response order, untimed
    pub lines: Vec<SubtitleLine>,
    pub summary: Option<String>,
    pub scene: Option<String>,
}

impl ParsedTranslation {
    /// Pair parsed lines with originals by number, copying their timing.
    /// Returns the matched lines and the numbers that matched nothing.
    pub fn match_originals(&self, originals: &[SubtitleLine]) -> (Vec<SubtitleLine>, Vec<usize>) {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        for line in &self.lines {
            match originals.iter().find(|original| original.number == line.number) {
                Some(original) => matched.push(original.translated_copy(line.text.clone())),
                None => unmatched.push(line.number),
            }
        }

        (matched, unmatched)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TranslationParser;

impl TranslationParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete response. A response without a single line block is fatal.
    pub fn parse(&self, text: &str) -> Result<ParsedTranslation, TranslationError> {
        let parsed = self.parse_partial(text);
        if parsed.lines.is_empty() {
            warn!("No translated lines found in response");
            return Err(TranslationError::fatal("No translated lines found in the response"));
        }
        debug!("Parsed {} translated lines", parsed.lines.len());
        Ok(parsed)
    }

    /// Parse whatever complete blocks a response contains, possibly none
    pub fn parse_partial(&self, text: &str) -> ParsedTranslation {
        let summary = extract_tag(&SUMMARY_REGEX, text);
        let scene = extract_tag(&SCENE_REGEX, text);

        let body = SCENE_REGEX.replace_all(&SUMMARY_REGEX.replace_all(text, ""), "").into_owned();

        let headers: Vec<(usize, usize, usize)> = LINE_NUMBER_REGEX
            .captures_iter(&body)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let number = captures.get(1)?.as_str().parse().ok()?;
                Some((whole.start(), whole.end(), number))
            })
            .collect();

        let mut lines = Vec::with_capacity(headers.len());
        for (index, (_, body_start, number)) in headers.iter().enumerate() {
            let body_end = headers.get(index + 1).map_or(body.len(), |next| next.0);
            if let Some(text) = block_translation(&body[*body_start..body_end]) {
                lines.push(SubtitleLine::untimed(*number, text));
            }
        }

        ParsedTranslation { lines, summary, scene }
    }
}

fn extract_tag(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|content| content.as_str().trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Text following the translation marker, or the whole block if the
/// response dropped the markers altogether
fn block_translation(block: &str) -> Option<String> {
    if let Some(position) = block.find(TRANSLATION_MARKER) {
        return Some(block[position + TRANSLATION_MARKER.len()..].trim().to_string());
    }
    if block.contains(ORIGINAL_MARKER) {
        return None;
    }
    let text = block.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}
