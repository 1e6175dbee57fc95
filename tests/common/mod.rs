/*!
 * Common test utilities for the subtrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use subtrans::document::{SubtitleBatch, SubtitleBuilder, SubtitleDocument, SubtitleLine, SubtitleScene};
use subtrans::translation::{TranslationEvents, TranslatorOptions};

/// Route library logging to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file with two scenes of three lines each
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.

4
00:01:30,000 --> 00:01:32,000
A new scene begins.

5
00:01:33,000 --> 00:01:35,000
With a second line.

6
00:01:36,000 --> 00:01:38,000
And a third.
"#;
    create_test_file(dir, filename, content)
}

/// Evenly spaced lines: one second long, half a second apart
pub fn timed_lines(count: usize) -> Vec<SubtitleLine> {
    (1..=count)
        .map(|number| {
            let start = (number as u64 - 1) * 1_500;
            SubtitleLine::new(number, start, start + 1_000, format!("Line {}", number))
        })
        .collect()
}

/// Document with one entry per scene, each holding batches of the given sizes.
/// Scenes are a minute apart.
pub fn document_from_line_counts(scenes: &[&[usize]]) -> SubtitleDocument {
    let mut builder = SubtitleBuilder::new();
    let mut time = 0u64;
    let mut number = 1;

    for batches in scenes {
        builder = builder.add_scene(None);
        for size in batches.iter() {
            builder = builder.add_batch(None);
            for _ in 0..*size {
                builder = builder.build_line(time, time + 1_000, &format!("Line {}", number));
                time += 1_500;
                number += 1;
            }
        }
        time += 60_000;
    }

    builder.build()
}

/// Scene numbers and batch sizes, for comparing document shapes
pub fn document_shape(document: &SubtitleDocument) -> Vec<(usize, Vec<(usize, usize)>)> {
    document.read(|state| {
        state
            .scenes()
            .iter()
            .map(|scene| {
                (
                    scene.number,
                    scene.batches.iter().map(|batch| (batch.number, batch.size())).collect(),
                )
            })
            .collect()
    })
}

/// Translator options with millisecond backoff
pub fn fast_options() -> TranslatorOptions {
    TranslatorOptions {
        backoff_time: Duration::from_millis(1),
        ..Default::default()
    }
}

/// Event sink that records everything it receives
#[derive(Default)]
pub struct RecordingEvents {
    pub translated: Mutex<Vec<(usize, usize)>>,
    pub updated: Mutex<Vec<(usize, usize, Vec<usize>)>>,
    pub failed: Mutex<Vec<(usize, usize)>>,
    pub scenes: Mutex<Vec<usize>>,
    pub errors: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<String>>,
}

impl RecordingEvents {
    pub fn translated(&self) -> Vec<(usize, usize)> {
        self.translated.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(usize, usize, Vec<usize>)> {
        self.updated.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(usize, usize)> {
        self.failed.lock().unwrap().clone()
    }

    pub fn scenes(&self) -> Vec<usize> {
        self.scenes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl TranslationEvents for RecordingEvents {
    fn batch_translated(&self, batch: &SubtitleBatch) {
        self.translated.lock().unwrap().push((batch.scene, batch.number));
    }

    fn batch_updated(&self, batch: &SubtitleBatch) {
        let lines = batch.translated.iter().map(|line| line.number).collect();
        self.updated.lock().unwrap().push((batch.scene, batch.number, lines));
    }

    fn batch_failed(&self, batch: &SubtitleBatch, _error: &str) {
        self.failed.lock().unwrap().push((batch.scene, batch.number));
    }

    fn scene_translated(&self, scene: &SubtitleScene) {
        self.scenes.lock().unwrap().push(scene.number);
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}
