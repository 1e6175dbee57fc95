/*!
 * Context supplied with each batch: where it sits in the document, project
 * settings and a short history of what has happened so far.
 */

use serde::{Deserialize, Serialize};

use crate::document::{DocumentState, Metadata};
use crate::errors::SubtitleError;

/// Context for a single batch translation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchContext {
    pub scene_number: usize,
    pub batch_number: usize,

    /// "Scene N" with the scene summary if there is one
    pub scene: String,

    /// "Batch N" with the batch summary if there is one
    pub batch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// Earlier scene and batch summaries, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
}

impl BatchContext {
    /// Collect the context for a batch, keeping at most `max_history_lines`
    /// history entries (0 keeps everything)
    pub fn for_batch(
        state: &DocumentState,
        scene_number: usize,
        batch_number: usize,
        max_history_lines: usize,
    ) -> Result<Self, SubtitleError> {
        let scene = state.scene(scene_number)?;
        let batch = scene.batch(batch_number)?;
        let settings = &state.settings;

        Ok(Self {
            scene_number: scene.number,
            batch_number: batch.number,
            scene: labelled("Scene", scene.number, scene.summary()),
            batch: labelled("Batch", batch.number, batch.summary()),
            movie_name: settings.movie_name.clone(),
            description: settings.description.clone(),
            names: settings.names.clone(),
            target_language: settings.target_language.clone(),
            history: batch_history(state, scene_number, batch_number, max_history_lines)?,
        })
    }

    /// The context as a metadata bag, for storing on the batch
    pub fn to_metadata(&self) -> Metadata {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => Metadata::new(),
        }
    }
}

fn labelled(label: &str, number: usize, summary: Option<&str>) -> String {
    match summary {
        Some(summary) => format!("{} {}: {}", label, number, summary),
        None => format!("{} {}", label, number),
    }
}

/// Summaries of earlier scenes, then earlier batches of the same scene.
/// A summary identical to the one before it is skipped.
pub fn batch_history(
    state: &DocumentState,
    scene_number: usize,
    batch_number: usize,
    max_lines: usize,
) -> Result<Vec<String>, SubtitleError> {
    let mut history = Vec::new();
    let mut last_summary = String::new();

    for scene in state.scenes().iter().filter(|scene| scene.number < scene_number) {
        if let Some(summary) = scene.summary() {
            if summary != last_summary {
                history.push(format!("scene {}: {}", scene.number, summary));
                last_summary = summary.to_string();
            }
        }
    }

    let scene = state.scene(scene_number)?;
    for batch in scene.batches.iter().filter(|batch| batch.number < batch_number) {
        if let Some(summary) = batch.summary() {
            if summary != last_summary {
                history.push(format!("scene {} batch {}: {}", batch.scene, batch.number, summary));
                last_summary = summary.to_string();
            }
        }
    }

    if max_lines > 0 && history.len() > max_lines {
        history.drain(..history.len() - max_lines);
    }

    Ok(history)
}
