/*!
 * Fluent construction of documents whose structure is already known.
 */

use super::batch::SubtitleBatch;
use super::line::SubtitleLine;
use super::scene::SubtitleScene;
use super::subtitles::{ProjectSettings, SubtitleDocument};

/// Builder for a scene/batch/line tree.
///
/// Lines are numbered sequentially from 1 in the order they are added.
#[derive(Debug, Clone, Default)]
pub struct SubtitleBuilder {
    scenes: Vec<SubtitleScene>,
    settings: ProjectSettings,
    next_line_number: usize,
    max_batch_size: Option<usize>,
}

impl SubtitleBuilder {
    pub fn new() -> Self {
        Self {
            next_line_number: 1,
            ..Default::default()
        }
    }

    /// Start a new batch automatically once the current one reaches `size` lines
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = Some(size.max(1));
        self
    }

    pub fn with_settings(mut self, settings: ProjectSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn add_scene(mut self, summary: Option<&str>) -> Self {
        let mut scene = SubtitleScene::new(self.scenes.len() + 1);
        scene.set_summary(summary.map(str::to_string));
        self.scenes.push(scene);
        self
    }

    pub fn add_batch(mut self, summary: Option<&str>) -> Self {
        if self.scenes.is_empty() {
            self = self.add_scene(None);
        }
        if let Some(scene) = self.scenes.last_mut() {
            let mut batch = SubtitleBatch::new(scene.number, scene.batches.len() + 1, Vec::new());
            batch.set_summary(summary.map(str::to_string));
            scene.batches.push(batch);
        }
        self
    }

    pub fn build_line(self, start_ms: u64, end_ms: u64, text: &str) -> Self {
        let number = self.next_line_number;
        self.add_line(SubtitleLine::new(number, start_ms, end_ms, text))
    }

    /// Append a line to the current batch, renumbering it to keep the sequence
    pub fn add_line(mut self, mut line: SubtitleLine) -> Self {
        let needs_batch = match self.scenes.last().and_then(|scene| scene.batches.last()) {
            None => true,
            Some(batch) => self.max_batch_size.is_some_and(|max| batch.size() >= max),
        };
        if needs_batch {
            self = self.add_batch(None);
        }

        line.number = self.next_line_number;
        self.next_line_number += 1;

        if let Some(batch) = self.scenes.last_mut().and_then(|scene| scene.batches.last_mut()) {
            batch.originals.push(line);
        }
        self
    }

    pub fn build(self) -> SubtitleDocument {
        SubtitleDocument::from_scenes(self.scenes).with_settings(self.settings)
    }
}
