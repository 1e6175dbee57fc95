/*!
 * A scene: a run of batches separated from its neighbours by a long gap.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::batch::{update_context, SubtitleBatch};
use super::join_summaries;
use super::line::{Metadata, SubtitleLine};
use crate::errors::SubtitleError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubtitleScene {
    /// 1-based scene number, global to the document
    pub number: usize,

    /// Rollup context for the scene (summary)
    #[serde(default)]
    pub context: Metadata,

    /// Batches in order
    #[serde(default)]
    pub batches: Vec<SubtitleBatch>,
}

impl SubtitleScene {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    pub fn with_batches(number: usize, batches: Vec<SubtitleBatch>) -> Self {
        let mut scene = Self {
            number,
            context: Metadata::new(),
            batches,
        };
        scene.renumber_batches();
        scene
    }

    /// Number of batches
    pub fn size(&self) -> usize {
        self.batches.len()
    }

    /// Number of original lines across all batches
    pub fn line_count(&self) -> usize {
        self.batches.iter().map(SubtitleBatch::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(SubtitleBatch::is_empty)
    }

    pub fn first_line_number(&self) -> Option<usize> {
        self.batches.iter().filter_map(SubtitleBatch::first_line_number).min()
    }

    pub fn last_line_number(&self) -> Option<usize> {
        self.batches.iter().filter_map(SubtitleBatch::last_line_number).max()
    }

    pub fn start_ms(&self) -> Option<u64> {
        self.batches.iter().find_map(SubtitleBatch::start_ms)
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.batches.iter().rev().find_map(SubtitleBatch::end_ms)
    }

    pub fn summary(&self) -> Option<&str> {
        self.context.get("summary").and_then(Value::as_str)
    }

    pub fn set_summary(&mut self, summary: Option<String>) {
        match summary {
            Some(summary) => {
                self.context.insert("summary".to_string(), Value::String(summary));
            }
            None => {
                self.context.remove("summary");
            }
        }
    }

    pub fn any_translated(&self) -> bool {
        self.batches.iter().any(SubtitleBatch::any_translated)
    }

    pub fn all_translated(&self) -> bool {
        !self.batches.is_empty() && self.batches.iter().all(SubtitleBatch::all_translated)
    }

    pub fn batch(&self, number: usize) -> Result<&SubtitleBatch, SubtitleError> {
        self.batches
            .iter()
            .find(|batch| batch.number == number)
            .ok_or(SubtitleError::BatchNotFound {
                scene: self.number,
                batch: number,
            })
    }

    pub fn batch_mut(&mut self, number: usize) -> Result<&mut SubtitleBatch, SubtitleError> {
        let scene = self.number;
        self.batches
            .iter_mut()
            .find(|batch| batch.number == number)
            .ok_or(SubtitleError::BatchNotFound { scene, batch: number })
    }

    pub(crate) fn batch_index(&self, number: usize) -> Result<usize, SubtitleError> {
        self.batches
            .iter()
            .position(|batch| batch.number == number)
            .ok_or(SubtitleError::BatchNotFound {
                scene: self.number,
                batch: number,
            })
    }

    pub fn originals(&self) -> impl Iterator<Item = &SubtitleLine> {
        self.batches.iter().flat_map(|batch| batch.originals.iter())
    }

    pub fn translated(&self) -> impl Iterator<Item = &SubtitleLine> {
        self.batches.iter().flat_map(|batch| batch.translated.iter())
    }

    /// Restore sequential batch numbering and propagate the scene number
    pub fn renumber_batches(&mut self) {
        for (index, batch) in self.batches.iter_mut().enumerate() {
            batch.number = index + 1;
            batch.scene = self.number;
        }
    }

    /// Append another scene's batches and summary to this one
    pub fn absorb(&mut self, other: SubtitleScene) {
        let summary = join_summaries(self.summary(), other.summary());
        for (key, value) in other.context {
            self.context.entry(key).or_insert(value);
        }
        self.set_summary(summary);
        self.batches.extend(other.batches);
        self.renumber_batches();
    }

    pub fn update_context(&mut self, update: &Metadata) -> bool {
        update_context(&mut self.context, update)
    }
}
