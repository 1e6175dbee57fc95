/*!
 * SubRip (`.srt`) reading and writing.
 *
 * Entries are a sequence number, a `HH:MM:SS,mmm --> HH:MM:SS,mmm` timing
 * line and one or more lines of text, separated by blank lines. Parsing is
 * lenient: malformed entries are skipped with a warning and the remaining
 * entries are sorted by start time and renumbered from 1.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{LoadedSubtitles, SubtitleFileHandler};
use crate::document::{Metadata, SubtitleLine};
use crate::errors::SubtitleError;

static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("valid timestamp regex")
});

/// SubRip file handler
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtFileHandler {
    /// Write `translation` instead of `text` where a line has one
    prefer_translation: bool,
}

impl SrtFileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose from translations, falling back to the original text
    pub fn with_translations(mut self, prefer_translation: bool) -> Self {
        self.prefer_translation = prefer_translation;
        self
    }

    /// Format milliseconds as `HH:MM:SS,mmm`
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Parse a single `HH:MM:SS,mmm` timestamp
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();
        if parts.len() != 4 {
            return Err(SubtitleError::Parse(format!("Invalid timestamp format: {}", timestamp)));
        }

        let mut values = [0u64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| SubtitleError::Parse(format!("Invalid timestamp format: {}", timestamp)))?;
        }
        let [hours, minutes, seconds, millis] = values;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(SubtitleError::Parse(format!(
                "Invalid time components in timestamp: {}",
                timestamp
            )));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    fn captured_ms(caps: &Captures, start_idx: usize) -> Option<u64> {
        let mut total = 0u64;
        for (offset, scale) in [3_600_000u64, 60_000, 1_000, 1].into_iter().enumerate() {
            let value: u64 = caps.get(start_idx + offset)?.as_str().parse().ok()?;
            total += value * scale;
        }
        Some(total)
    }

    fn text_for<'a>(&self, line: &'a SubtitleLine) -> &'a str {
        match (&line.translation, self.prefer_translation) {
            (Some(translation), true) => translation.as_str(),
            _ => line.text.as_str(),
        }
    }
}

/// Entry being assembled by the parser
#[derive(Default)]
struct PendingEntry {
    number: Option<usize>,
    timing: Option<(u64, u64)>,
    text: String,
}

impl PendingEntry {
    fn is_started(&self) -> bool {
        self.number.is_some() || self.timing.is_some()
    }

    /// Finish the entry, or `None` if it is incomplete
    fn finish(&mut self, line_count: usize) -> Option<SubtitleLine> {
        let entry = std::mem::take(self);
        let (start_ms, end_ms) = entry.timing?;
        let text = entry.text.trim();
        if text.is_empty() {
            warn!("Skipping empty subtitle entry ending at line {}", line_count);
            return None;
        }
        if end_ms <= start_ms {
            warn!(
                "Skipping subtitle entry ending at line {}: end time is not after start time",
                line_count
            );
            return None;
        }
        Some(SubtitleLine::new(entry.number.unwrap_or(0), start_ms, end_ms, text))
    }
}

impl SubtitleFileHandler for SrtFileHandler {
    fn format(&self) -> &'static str {
        "srt"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["srt"]
    }

    fn load(&self, content: &str) -> Result<LoadedSubtitles, SubtitleError> {
        let content = content.trim_start_matches('\u{feff}');
        let mut lines = Vec::new();
        let mut entry = PendingEntry::default();
        let mut line_count = 0;

        for raw in content.lines() {
            line_count += 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                if entry.timing.is_some() && !entry.text.is_empty() {
                    lines.extend(entry.finish(line_count));
                }
                continue;
            }

            // Sequence number starts a new entry
            if !entry.is_started() {
                if let Ok(number) = trimmed.parse::<usize>() {
                    entry.number = Some(number);
                    continue;
                }
            }

            if entry.timing.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    match (Self::captured_ms(&caps, 1), Self::captured_ms(&caps, 5)) {
                        (Some(start_ms), Some(end_ms)) => {
                            entry.timing = Some((start_ms, end_ms));
                            continue;
                        }
                        _ => warn!("Invalid timestamp format at line {}: {}", line_count, trimmed),
                    }
                }
            }

            if entry.timing.is_some() {
                if !entry.text.is_empty() {
                    entry.text.push('\n');
                }
                entry.text.push_str(trimmed);
            } else {
                warn!(
                    "Unexpected text at line {} before sequence number or timestamp: {}",
                    line_count, trimmed
                );
            }
        }

        if entry.timing.is_some() {
            lines.extend(entry.finish(line_count));
        }

        if lines.is_empty() {
            return Err(SubtitleError::Parse(
                "No valid subtitle entries were found in the SRT content".to_string(),
            ));
        }

        lines.sort_by_key(|line| line.start_ms);

        let overlaps = lines
            .windows(2)
            .filter(|pair| pair[0].end_ms > pair[1].start_ms)
            .count();
        if overlaps > 0 {
            warn!("Found {} overlapping subtitle entries", overlaps);
        }

        for (index, line) in lines.iter_mut().enumerate() {
            line.number = index + 1;
        }

        debug!("Parsed {} SRT entries", lines.len());
        Ok(LoadedSubtitles {
            lines,
            metadata: Metadata::new(),
            format: self.format().to_string(),
        })
    }

    fn compose(&self, lines: &[SubtitleLine], _metadata: &Metadata) -> Result<String, SubtitleError> {
        let mut output = String::new();
        for (index, line) in lines.iter().enumerate() {
            let start_ms = line
                .start_ms
                .ok_or_else(|| SubtitleError::Compose(format!("Line {} has no start time", line.number)))?;
            let end_ms = line.end_ms.unwrap_or(start_ms);

            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                index + 1,
                Self::format_timestamp(start_ms),
                Self::format_timestamp(end_ms),
                self.text_for(line).trim()
            ));
        }
        Ok(output)
    }
}
