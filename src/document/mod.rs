/*!
 * Subtitle data model.
 *
 * A document owns scenes, a scene owns batches, a batch owns lines. Nothing
 * is shared between parents; structural changes go through the editor.
 */

pub mod batch;
pub mod builder;
pub mod line;
pub mod scene;
pub mod subtitles;

pub use batch::{MergedLines, SubtitleBatch};
pub use builder::SubtitleBuilder;
pub use line::{LineUpdate, Metadata, SubtitleLine};
pub use scene::SubtitleScene;
pub use subtitles::{DocumentGuard, DocumentState, ProjectFile, ProjectSettings, SubtitleDocument};

/// Join two optional summaries with a newline, skipping blanks
pub(crate) fn join_summaries(first: Option<&str>, second: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, second]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}
