/*!
 * Batching of raw subtitle lines into scenes and batches.
 *
 * A scene break happens wherever the silence between two lines exceeds the
 * scene threshold. Each scene is then split into batches no larger than
 * `max_batch_size`, preferring to cut at the largest pause so that a batch
 * holds a coherent stretch of dialogue.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{SubtitleBatch, SubtitleLine, SubtitleScene};
use crate::errors::SubtitleError;

/// Configuration for the batcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatcherConfig {
    /// Gap in milliseconds that starts a new scene
    #[serde(default = "default_scene_threshold_ms")]
    pub scene_threshold_ms: u64,

    /// Smallest batch the batcher will create when it has a choice
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    /// Largest batch the batcher will create
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Clamp overlapping lines to start where the previous line ends
    #[serde(default = "default_true")]
    pub prevent_overlap: bool,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            scene_threshold_ms: default_scene_threshold_ms(),
            min_batch_size: default_min_batch_size(),
            max_batch_size: default_max_batch_size(),
            prevent_overlap: true,
        }
    }
}

fn default_scene_threshold_ms() -> u64 {
    30_000
}

fn default_min_batch_size() -> usize {
    10
}

fn default_max_batch_size() -> usize {
    30
}

fn default_true() -> bool {
    true
}

impl BatcherConfig {
    pub fn validate(&self) -> Result<(), SubtitleError> {
        if self.max_batch_size == 0 {
            return Err(SubtitleError::Config("max_batch_size must be at least 1".to_string()));
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(SubtitleError::Config(format!(
                "min_batch_size ({}) is larger than max_batch_size ({})",
                self.min_batch_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}

/// Partitions an ordered line sequence into scenes and batches
#[derive(Debug, Clone)]
pub struct SubtitleBatcher {
    config: BatcherConfig,
}

impl SubtitleBatcher {
    /// Create a batcher, rejecting inconsistent size limits
    pub fn new(config: BatcherConfig) -> Result<Self, SubtitleError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Group lines into numbered scenes of numbered batches
    pub fn batch_subtitles(&self, lines: &[SubtitleLine]) -> Vec<SubtitleScene> {
        let lines = if self.config.prevent_overlap {
            Self::clamp_overlaps(lines)
        } else {
            lines.to_vec()
        };

        let scenes: Vec<SubtitleScene> = self
            .split_scenes(lines)
            .into_iter()
            .enumerate()
            .map(|(index, scene_lines)| {
                let number = index + 1;
                let batches = self
                    .split_lines(scene_lines)
                    .into_iter()
                    .map(|batch_lines| SubtitleBatch::new(number, 0, batch_lines))
                    .collect();
                SubtitleScene::with_batches(number, batches)
            })
            .collect();

        debug!(
            "Batched {} lines into {} scenes and {} batches",
            scenes.iter().map(SubtitleScene::line_count).sum::<usize>(),
            scenes.len(),
            scenes.iter().map(SubtitleScene::size).sum::<usize>()
        );

        scenes
    }

    /// Split a run of lines into scene runs wherever the gap exceeds the threshold
    pub fn split_scenes(&self, lines: Vec<SubtitleLine>) -> Vec<Vec<SubtitleLine>> {
        let mut scenes: Vec<Vec<SubtitleLine>> = Vec::new();
        let mut current: Vec<SubtitleLine> = Vec::new();

        for line in lines {
            let is_break = current
                .last()
                .is_some_and(|previous| line.gap_after(previous) > self.config.scene_threshold_ms);
            if is_break {
                scenes.push(std::mem::take(&mut current));
            }
            current.push(line);
        }

        if !current.is_empty() {
            scenes.push(current);
        }

        scenes
    }

    /// Recursively subdivide a run of lines until every part fits `max_batch_size`
    pub fn split_lines(&self, lines: Vec<SubtitleLine>) -> Vec<Vec<SubtitleLine>> {
        if lines.len() <= self.config.max_batch_size {
            return vec![lines];
        }

        let split_index = self
            .find_best_split(&lines, self.config.min_batch_size)
            .unwrap_or(self.config.max_batch_size);

        let mut lines = lines;
        let tail = lines.split_off(split_index);

        let mut batches = self.split_lines(lines);
        batches.extend(self.split_lines(tail));
        batches
    }

    /// Index of the largest gap at which both halves are at least `min_size`
    /// lines and can still be batched within the size limits
    pub fn find_best_split(&self, lines: &[SubtitleLine], min_size: usize) -> Option<usize> {
        largest_gap(lines, min_size, |index| {
            self.can_partition(index) && self.can_partition(lines.len() - index)
        })
    }

    /// Whether `count` lines can be cut into batches that all respect both limits
    fn can_partition(&self, count: usize) -> bool {
        let max = self.config.max_batch_size;
        let min = self.config.min_batch_size;
        if count <= max {
            return count >= min;
        }
        let parts = count.div_ceil(max);
        parts * min <= count
    }

    /// Clamp each line that starts before the previous line ends
    fn clamp_overlaps(lines: &[SubtitleLine]) -> Vec<SubtitleLine> {
        let mut result: Vec<SubtitleLine> = Vec::with_capacity(lines.len());
        for line in lines {
            let mut line = line.clone();
            if let (Some(previous_end), Some(start)) =
                (result.last().and_then(|previous| previous.end_ms), line.start_ms)
            {
                if start < previous_end {
                    debug!("Line {} overlaps the previous line, clamping start", line.number);
                    line.start_ms = Some(previous_end);
                    if line.end_ms.is_some_and(|end| end < previous_end) {
                        line.end_ms = Some(previous_end);
                    }
                }
            }
            result.push(line);
        }
        result
    }
}

/// Index of the largest gap that leaves at least `min_size` lines on each side,
/// ignoring any maximum batch size
pub fn find_split_point(lines: &[SubtitleLine], min_size: usize) -> Option<usize> {
    largest_gap(lines, min_size, |_| true)
}

/// Ties go to the earliest gap
fn largest_gap(lines: &[SubtitleLine], min_size: usize, accept: impl Fn(usize) -> bool) -> Option<usize> {
    let min_size = min_size.max(1);
    if lines.len() < min_size * 2 {
        return None;
    }

    let mut best: Option<(usize, u64)> = None;
    for index in min_size..=(lines.len() - min_size) {
        if !accept(index) {
            continue;
        }
        let gap = lines[index].gap_after(&lines[index - 1]);
        if best.is_none_or(|(_, best_gap)| gap > best_gap) {
            best = Some((index, gap));
        }
    }

    best.map(|(index, _)| index)
}
