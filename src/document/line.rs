/*!
 * A single timed subtitle line.
 *
 * Times are stored as millisecond offsets from the start of the media.
 * Translated lines are separate `SubtitleLine` values paired with their
 * original by line number.
 */

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value bag used for line metadata and batch/scene context
pub type Metadata = BTreeMap<String, Value>;

/// One timed text unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubtitleLine {
    /// 1-based line number. Zero marks a line that was never numbered.
    pub number: usize,

    /// Start offset in milliseconds
    #[serde(rename = "start", default)]
    pub start_ms: Option<u64>,

    /// End offset in milliseconds
    #[serde(rename = "end", default)]
    pub end_ms: Option<u64>,

    /// Line text
    #[serde(default)]
    pub text: String,

    /// Translated text, if any
    #[serde(default)]
    pub translation: Option<String>,

    /// Free-form metadata carried through from the source format
    #[serde(default)]
    pub metadata: Metadata,
}

/// A single field change applied by the editor
#[derive(Debug, Clone, PartialEq)]
pub enum LineUpdate {
    /// New start and/or end time; `None` leaves that bound unchanged
    Timing {
        start_ms: Option<u64>,
        end_ms: Option<u64>,
    },

    /// New original text
    Text(String),

    /// Metadata changes; a `None` value removes the key
    Metadata(BTreeMap<String, Option<Value>>),

    /// New translation; `None` clears it
    Translation(Option<String>),
}

impl SubtitleLine {
    pub fn new(number: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            number,
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
            text: text.into(),
            translation: None,
            metadata: Metadata::new(),
        }
    }

    /// Line with a number and text but no timing
    pub fn untimed(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// A line is usable once it has a number and a start time
    pub fn is_valid(&self) -> bool {
        self.number > 0 && self.start_ms.is_some()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match (self.start_ms, self.end_ms) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }

    /// Number of line breaks in the text
    pub fn newline_count(&self) -> usize {
        self.text.matches('\n').count()
    }

    /// Number of characters in the text, ignoring line breaks
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| *c != '\n').count()
    }

    /// Translated counterpart with the same number and timing
    pub fn translated_copy(&self, text: impl Into<String>) -> SubtitleLine {
        SubtitleLine {
            number: self.number,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            text: text.into(),
            translation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Gap between the end of `previous` and the start of this line.
    /// Missing timing counts as no gap; overlaps count as zero.
    pub fn gap_after(&self, previous: &SubtitleLine) -> u64 {
        match (previous.end_ms, self.start_ms) {
            (Some(end), Some(start)) => start.saturating_sub(end),
            _ => 0,
        }
    }

    /// Combine contiguous lines into one. Returns `None` for an empty slice.
    pub fn merge(lines: &[SubtitleLine]) -> Option<SubtitleLine> {
        let first = lines.first()?;
        let last = lines.last()?;

        let text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let translations: Vec<&str> = lines
            .iter()
            .filter_map(|line| line.translation.as_deref())
            .collect();

        let mut metadata = Metadata::new();
        for line in lines {
            for (key, value) in &line.metadata {
                metadata.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Some(SubtitleLine {
            number: first.number,
            start_ms: first.start_ms,
            end_ms: last.end_ms.or(first.end_ms),
            text,
            translation: if translations.is_empty() {
                None
            } else {
                Some(translations.join("\n"))
            },
            metadata,
        })
    }

    /// Apply an update, returning whether anything changed
    pub fn apply(&mut self, update: &LineUpdate) -> bool {
        match update {
            LineUpdate::Timing { start_ms, end_ms } => {
                let mut changed = false;
                if let Some(start) = start_ms {
                    if self.start_ms != Some(*start) {
                        self.start_ms = Some(*start);
                        changed = true;
                    }
                }
                if let Some(end) = end_ms {
                    if self.end_ms != Some(*end) {
                        self.end_ms = Some(*end);
                        changed = true;
                    }
                }
                changed
            }
            LineUpdate::Text(text) => {
                if self.text == *text {
                    return false;
                }
                self.text = text.clone();
                true
            }
            LineUpdate::Metadata(changes) => {
                let mut changed = false;
                for (key, value) in changes {
                    match value {
                        Some(value) => {
                            if self.metadata.get(key) != Some(value) {
                                self.metadata.insert(key.clone(), value.clone());
                                changed = true;
                            }
                        }
                        None => {
                            changed |= self.metadata.remove(key).is_some();
                        }
                    }
                }
                changed
            }
            LineUpdate::Translation(translation) => {
                if self.translation == *translation {
                    return false;
                }
                self.translation = translation.clone();
                true
            }
        }
    }

    /// Updates that would restore this line's current state, used for undo
    pub fn as_updates(&self, touched_keys: &[String]) -> Vec<LineUpdate> {
        let mut updates = vec![
            LineUpdate::Timing {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            },
            LineUpdate::Text(self.text.clone()),
            LineUpdate::Translation(self.translation.clone()),
        ];

        if !touched_keys.is_empty() {
            let restore = touched_keys
                .iter()
                .map(|key| (key.clone(), self.metadata.get(key).cloned()))
                .collect();
            updates.push(LineUpdate::Metadata(restore));
        }

        updates
    }
}

impl fmt::Display for SubtitleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.number, self.text.replace('\n', " / "))
    }
}
