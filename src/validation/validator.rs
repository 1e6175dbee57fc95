/*!
 * Checks a batch's translated lines against configured limits.
 *
 * Problems are collected, never raised: every check runs, one error record
 * is produced per kind of problem (listing the affected lines), and the
 * result replaces the validation errors stored on the batch.
 */

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{SubtitleBatch, SubtitleLine};
use crate::errors::{BatchError, ValidationError};

/// Limits applied to translated lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum characters per line of translated text, if limited
    #[serde(default = "default_max_characters")]
    pub max_characters: Option<usize>,

    /// Maximum line breaks in a translated line, if limited
    #[serde(default = "default_max_newlines")]
    pub max_newlines: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_characters: default_max_characters(),
            max_newlines: default_max_newlines(),
        }
    }
}

fn default_max_characters() -> Option<usize> {
    Some(120)
}

fn default_max_newlines() -> Option<usize> {
    Some(2)
}

#[derive(Debug, Clone, Default)]
pub struct SubtitleValidator {
    config: ValidationConfig,
}

impl SubtitleValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Per-line checks on a list of translated lines.
    /// An empty list is reported as untranslated.
    pub fn validate_translations(&self, lines: &[SubtitleLine]) -> Vec<ValidationError> {
        if lines.is_empty() {
            return vec![ValidationError::UntranslatedLines { lines: Vec::new() }];
        }

        let mut unmatched = Vec::new();
        let mut empty = Vec::new();
        let mut too_long = Vec::new();
        let mut too_many_newlines = Vec::new();

        for line in lines {
            if line.number == 0 {
                unmatched.push(line.number);
                continue;
            }

            if line.text.trim().is_empty() {
                empty.push(line.number);
                continue;
            }

            if let Some(max) = self.config.max_characters {
                if line.char_count() > max {
                    too_long.push(line.number);
                }
            }

            if let Some(max) = self.config.max_newlines {
                if line.newline_count() > max {
                    too_many_newlines.push(line.number);
                }
            }
        }

        let mut errors = Vec::new();
        if !unmatched.is_empty() {
            errors.push(ValidationError::UnmatchedLines { lines: unmatched });
        }
        if !empty.is_empty() {
            errors.push(ValidationError::EmptyLines { lines: empty });
        }
        if let (false, Some(max_characters)) = (too_long.is_empty(), self.config.max_characters) {
            errors.push(ValidationError::LineTooLong {
                lines: too_long,
                max_characters,
            });
        }
        if let (false, Some(max_newlines)) = (too_many_newlines.is_empty(), self.config.max_newlines) {
            errors.push(ValidationError::TooManyNewlines {
                lines: too_many_newlines,
                max_newlines,
            });
        }
        errors
    }

    /// Validate a batch and store the result on it, keeping any
    /// non-validation errors already recorded
    pub fn validate_batch(&self, batch: &mut SubtitleBatch) -> Vec<ValidationError> {
        let mut errors = self.validate_translations(&batch.translated);

        let originals: BTreeSet<usize> = batch.originals.iter().map(|line| line.number).collect();

        let stray: Vec<usize> = batch
            .translated
            .iter()
            .map(|line| line.number)
            .filter(|number| *number != 0 && !originals.contains(number))
            .collect();
        if !stray.is_empty() {
            let existing = errors
                .iter()
                .position(|error| matches!(error, ValidationError::UnmatchedLines { .. }));
            match existing {
                Some(index) => {
                    if let ValidationError::UnmatchedLines { lines } = &mut errors[index] {
                        lines.extend(stray);
                    }
                }
                None => errors.insert(0, ValidationError::UnmatchedLines { lines: stray }),
            }
        }

        if !batch.translated.is_empty() {
            let translated: BTreeSet<usize> = batch.translated.iter().map(|line| line.number).collect();
            let missing: Vec<usize> = originals.difference(&translated).copied().collect();
            if !missing.is_empty() {
                errors.push(ValidationError::UntranslatedLines { lines: missing });
            }
        }

        if !errors.is_empty() {
            debug!(
                "Batch ({},{}) has {} validation error(s)",
                batch.scene,
                batch.number,
                errors.len()
            );
        }

        batch.errors.retain(|error| error.as_validation().is_none());
        batch
            .errors
            .extend(errors.iter().cloned().map(BatchError::Validation));
        errors
    }
}
