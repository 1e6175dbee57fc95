/*!
 * A batch: a contiguous run of lines sent to the translator in one request.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::join_summaries;
use super::line::{Metadata, SubtitleLine};
use crate::errors::{BatchError, SubtitleError};

/// Ordered run of lines with a translation context and error list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubtitleBatch {
    /// Owning scene number
    #[serde(default)]
    pub scene: usize,

    /// 1-based batch number within the scene
    pub number: usize,

    /// Original lines, sorted by number
    #[serde(default)]
    pub originals: Vec<SubtitleLine>,

    /// Translated lines, sorted by number, each matching an original
    #[serde(default)]
    pub translated: Vec<SubtitleLine>,

    /// Prompt context (summary and anything else the translator records)
    #[serde(default)]
    pub context: Metadata,

    /// Errors recorded by the last translation or validation pass
    #[serde(default)]
    pub errors: Vec<BatchError>,
}

impl SubtitleBatch {
    pub fn new(scene: usize, number: usize, originals: Vec<SubtitleLine>) -> Self {
        Self {
            scene,
            number,
            originals,
            ..Default::default()
        }
    }

    pub fn size(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    pub fn first_line_number(&self) -> Option<usize> {
        self.originals.iter().map(|line| line.number).min()
    }

    pub fn last_line_number(&self) -> Option<usize> {
        self.originals.iter().map(|line| line.number).max()
    }

    pub fn start_ms(&self) -> Option<u64> {
        self.originals.first().and_then(|line| line.start_ms)
    }

    pub fn end_ms(&self) -> Option<u64> {
        self.originals.last().and_then(|line| line.end_ms)
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

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn contains_line(&self, number: usize) -> bool {
        self.original_index(number).is_some()
    }

    pub fn any_translated(&self) -> bool {
        !self.translated.is_empty()
    }

    /// True when every original has a translated counterpart
    pub fn all_translated(&self) -> bool {
        !self.originals.is_empty()
            && self
                .originals
                .iter()
                .all(|line| self.translated_index(line.number).is_some())
    }

    pub fn original_line(&self, number: usize) -> Option<&SubtitleLine> {
        self.original_index(number).map(|i| &self.originals[i])
    }

    pub fn original_line_mut(&mut self, number: usize) -> Option<&mut SubtitleLine> {
        self.original_index(number).map(move |i| &mut self.originals[i])
    }

    pub fn translated_line(&self, number: usize) -> Option<&SubtitleLine> {
        self.translated_index(number).map(|i| &self.translated[i])
    }

    fn original_index(&self, number: usize) -> Option<usize> {
        self.originals.iter().position(|line| line.number == number)
    }

    fn translated_index(&self, number: usize) -> Option<usize> {
        self.translated.iter().position(|line| line.number == number)
    }

    /// Add or replace a translated line and mirror its text onto the original
    pub fn set_translated_line(&mut self, line: SubtitleLine) {
        if let Some(original) = self.original_line_mut(line.number) {
            original.translation = Some(line.text.clone());
        }
        insert_sorted(&mut self.translated, line);
    }

    /// Remove a translated line, clearing the original's translation text
    pub fn remove_translated_line(&mut self, number: usize) -> Option<SubtitleLine> {
        let index = self.translated_index(number)?;
        if let Some(original) = self.original_line_mut(number) {
            original.translation = None;
        }
        Some(self.translated.remove(index))
    }

    /// Remove the given line numbers, returning the removed originals and translations
    pub fn delete_lines(&mut self, numbers: &[usize]) -> (Vec<SubtitleLine>, Vec<SubtitleLine>) {
        let (deleted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.originals)
            .into_iter()
            .partition(|line| numbers.contains(&line.number));
        self.originals = kept;

        let (deleted_translated, kept_translated): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.translated)
                .into_iter()
                .partition(|line| numbers.contains(&line.number));
        self.translated = kept_translated;

        (deleted, deleted_translated)
    }

    /// Put lines back in number order, replacing any with the same number
    pub fn insert_lines(&mut self, originals: Vec<SubtitleLine>, translated: Vec<SubtitleLine>) {
        for line in originals {
            insert_sorted(&mut self.originals, line);
        }
        for line in translated {
            insert_sorted(&mut self.translated, line);
        }
    }

    /// Translated lines with no matching original
    pub fn remove_orphaned_translations(&mut self) -> Vec<SubtitleLine> {
        let numbers: Vec<usize> = self.originals.iter().map(|line| line.number).collect();
        let (orphans, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.translated)
            .into_iter()
            .partition(|line| !numbers.contains(&line.number));
        self.translated = kept;
        orphans
    }

    /// Collapse a contiguous run of lines into one original (and one translation
    /// if any were translated). Returns the merged pair plus the replaced lines.
    pub fn merge_lines(&mut self, numbers: &[usize]) -> Result<MergedLines, SubtitleError> {
        if numbers.len() < 2 {
            return Err(SubtitleError::structure("At least two lines are needed to merge"));
        }

        let mut sorted = numbers.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let start = self
            .original_index(sorted[0])
            .ok_or(SubtitleError::LineNotFound(sorted[0]))?;
        let end = start + sorted.len();
        if end > self.originals.len()
            || self.originals[start..end]
                .iter()
                .zip(&sorted)
                .any(|(line, number)| line.number != *number)
        {
            return Err(SubtitleError::structure(format!(
                "Lines to merge must be contiguous in batch ({},{})",
                self.scene, self.number
            )));
        }

        let replaced: Vec<SubtitleLine> = self.originals.drain(start..end).collect();
        let merged = SubtitleLine::merge(&replaced)
            .ok_or_else(|| SubtitleError::structure("No lines to merge"))?;
        self.originals.insert(start, merged.clone());

        let replaced_translated: Vec<SubtitleLine> = {
            let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.translated)
                .into_iter()
                .partition(|line| sorted.contains(&line.number));
            self.translated = kept;
            taken
        };

        let merged_translated = SubtitleLine::merge(&replaced_translated).map(|mut line| {
            line.number = merged.number;
            line.start_ms = merged.start_ms;
            line.end_ms = merged.end_ms;
            line
        });
        if let Some(line) = &merged_translated {
            insert_sorted(&mut self.translated, line.clone());
        }

        Ok(MergedLines {
            merged,
            merged_translated,
            originals: replaced,
            translated: replaced_translated,
        })
    }

    /// Split off every line from `line_number` onward into a new batch.
    /// Translated lines split at `translated_line_number` (defaults to the same line).
    pub fn split_at_line(
        &mut self,
        line_number: usize,
        translated_line_number: Option<usize>,
    ) -> Result<SubtitleBatch, SubtitleError> {
        let index = self
            .original_index(line_number)
            .ok_or(SubtitleError::LineNotFound(line_number))?;
        if index == 0 {
            return Err(SubtitleError::structure(format!(
                "Cannot split batch ({},{}) at its first line",
                self.scene, self.number
            )));
        }

        let tail = self.originals.split_off(index);

        let translated_split = translated_line_number.unwrap_or(line_number);
        let translated_index = self
            .translated
            .iter()
            .position(|line| line.number >= translated_split)
            .unwrap_or(self.translated.len());
        let tail_translated = self.translated.split_off(translated_index);

        let mut batch = SubtitleBatch::new(self.scene, self.number + 1, tail);
        batch.translated = tail_translated;
        Ok(batch)
    }

    /// Append another batch's lines, summaries and errors to this one
    pub fn absorb(&mut self, other: SubtitleBatch) {
        let summary = join_summaries(self.summary(), other.summary());
        for (key, value) in other.context {
            self.context.entry(key).or_insert(value);
        }
        self.set_summary(summary);
        self.originals.extend(other.originals);
        self.translated.extend(other.translated);
        self.errors.extend(other.errors);
    }

    /// Merge keys into the context, returning whether anything changed
    pub fn update_context(&mut self, update: &Metadata) -> bool {
        update_context(&mut self.context, update)
    }
}

/// Result of merging lines within a batch
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLines {
    pub merged: SubtitleLine,
    pub merged_translated: Option<SubtitleLine>,
    pub originals: Vec<SubtitleLine>,
    pub translated: Vec<SubtitleLine>,
}

pub(crate) fn insert_sorted(lines: &mut Vec<SubtitleLine>, line: SubtitleLine) {
    match lines.binary_search_by_key(&line.number, |existing| existing.number) {
        Ok(index) => lines[index] = line,
        Err(index) => lines.insert(index, line),
    }
}

pub(crate) fn update_context(context: &mut Metadata, update: &Metadata) -> bool {
    let mut changed = false;
    for (key, value) in update {
        if value.is_null() {
            changed |= context.remove(key).is_some();
        } else if context.get(key) != Some(value) {
            context.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}
