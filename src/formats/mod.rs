/*!
 * Subtitle file formats.
 *
 * A handler turns subtitle text into numbered, timed lines and back. The
 * document model never sees the file format; it only receives the lines and
 * whatever metadata the handler chose to keep.
 */

use std::path::Path;

use crate::document::{Metadata, SubtitleLine};
use crate::errors::SubtitleError;

pub mod srt;

pub use srt::SrtFileHandler;

/// Result of loading a subtitle file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedSubtitles {
    /// Lines in file order, numbered from 1
    pub lines: Vec<SubtitleLine>,
    /// Format-level metadata to carry through to `compose`
    pub metadata: Metadata,
    /// Short name of the detected format, e.g. `srt`
    pub format: String,
}

/// Reads and writes one subtitle format
pub trait SubtitleFileHandler: Send + Sync {
    /// Short format name
    fn format(&self) -> &'static str;

    /// File extensions handled, without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// Parse subtitle text
    fn load(&self, content: &str) -> Result<LoadedSubtitles, SubtitleError>;

    /// Render lines back to subtitle text
    fn compose(&self, lines: &[SubtitleLine], metadata: &Metadata) -> Result<String, SubtitleError>;

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions().iter().any(|known| known.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// Pick a handler for a file path by extension
pub fn handler_for_path(path: &Path) -> Result<Box<dyn SubtitleFileHandler>, SubtitleError> {
    let srt = SrtFileHandler::new();
    if srt.handles(path) {
        return Ok(Box::new(srt));
    }
    Err(SubtitleError::Parse(format!(
        "Unsupported subtitle format: {}",
        path.display()
    )))
}
