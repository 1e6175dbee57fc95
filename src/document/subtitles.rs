/*!
 * The subtitle document: scenes plus a flattened line cache, guarded by a
 * reentrant lock so a translator and an editor can interleave safely.
 *
 * The lock is a `parking_lot::ReentrantMutex` around a `RefCell`. Guards
 * must never be held across an `.await`; the translator only takes the
 * lock to read a batch and to attach the finished translation.
 */

use std::cell::{Ref, RefCell, RefMut};
use std::fs;
use std::path::Path;

use log::debug;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use serde::{Deserialize, Serialize};

use super::batch::SubtitleBatch;
use super::line::{Metadata, SubtitleLine};
use super::scene::SubtitleScene;
use crate::editor::SubtitleEditor;
use crate::errors::{AppError, SubtitleError};

/// Project-level settings supplied to the translator as context
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Title of the movie or show
    #[serde(default)]
    pub movie_name: Option<String>,

    /// Short synopsis
    #[serde(default)]
    pub description: Option<String>,

    /// Names the translator should spell consistently
    #[serde(default)]
    pub names: Vec<String>,

    /// Language to translate into
    #[serde(default)]
    pub target_language: Option<String>,

    /// Anything else
    #[serde(default, flatten)]
    pub extra: Metadata,
}

/// Persisted shape of a document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default)]
    pub scenes: Vec<SubtitleScene>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub settings: ProjectSettings,
}

/// Document contents, reachable only through the document lock
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    scenes: Vec<SubtitleScene>,
    originals: Vec<SubtitleLine>,
    translated: Vec<SubtitleLine>,
    start_line_number: usize,

    /// Format metadata carried through from the source file
    pub metadata: Metadata,

    /// Project settings
    pub settings: ProjectSettings,
}

impl DocumentState {
    pub fn scenes(&self) -> &[SubtitleScene] {
        &self.scenes
    }

    /// Replace the scene list and rebuild the line cache
    pub fn set_scenes(&mut self, scenes: Vec<SubtitleScene>) {
        self.scenes = scenes;
        self.refresh();
    }

    /// Set the original lines of an unbatched document
    pub fn set_originals(&mut self, lines: Vec<SubtitleLine>) {
        self.scenes.clear();
        self.translated.clear();
        self.start_line_number = lines.first().map_or(1, |line| line.number);
        self.originals = lines;
    }

    pub(crate) fn scenes_mut(&mut self) -> &mut Vec<SubtitleScene> {
        &mut self.scenes
    }

    /// Rebuild the flattened line cache from the scenes
    pub fn refresh(&mut self) {
        self.originals = self
            .scenes
            .iter()
            .flat_map(|scene| scene.originals().cloned())
            .collect();
        self.translated = self
            .scenes
            .iter()
            .flat_map(|scene| scene.translated().cloned())
            .collect();
        self.start_line_number = self.originals.first().map_or(1, |line| line.number);
    }

    /// Restore sequential scene and batch numbering
    pub fn renumber_scenes(&mut self) {
        for (index, scene) in self.scenes.iter_mut().enumerate() {
            scene.number = index + 1;
            scene.renumber_batches();
        }
    }

    pub fn originals(&self) -> &[SubtitleLine] {
        &self.originals
    }

    pub fn translated(&self) -> &[SubtitleLine] {
        &self.translated
    }

    pub fn start_line_number(&self) -> usize {
        self.start_line_number
    }

    pub fn line_count(&self) -> usize {
        self.originals.len()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn has_scenes(&self) -> bool {
        !self.scenes.is_empty()
    }

    pub fn any_translated(&self) -> bool {
        self.scenes.iter().any(SubtitleScene::any_translated)
    }

    pub fn all_translated(&self) -> bool {
        !self.scenes.is_empty() && self.scenes.iter().all(SubtitleScene::all_translated)
    }

    pub fn scene(&self, number: usize) -> Result<&SubtitleScene, SubtitleError> {
        self.scenes
            .iter()
            .find(|scene| scene.number == number)
            .ok_or(SubtitleError::SceneNotFound(number))
    }

    pub fn scene_mut(&mut self, number: usize) -> Result<&mut SubtitleScene, SubtitleError> {
        self.scenes
            .iter_mut()
            .find(|scene| scene.number == number)
            .ok_or(SubtitleError::SceneNotFound(number))
    }

    pub(crate) fn scene_index(&self, number: usize) -> Result<usize, SubtitleError> {
        self.scenes
            .iter()
            .position(|scene| scene.number == number)
            .ok_or(SubtitleError::SceneNotFound(number))
    }

    pub fn batch(&self, scene: usize, batch: usize) -> Result<&SubtitleBatch, SubtitleError> {
        self.scene(scene)?.batch(batch)
    }

    pub fn batch_mut(&mut self, scene: usize, batch: usize) -> Result<&mut SubtitleBatch, SubtitleError> {
        self.scene_mut(scene)?.batch_mut(batch)
    }

    /// Every (scene, batch) key in document order
    pub fn batch_keys(&self) -> Vec<(usize, usize)> {
        self.scenes
            .iter()
            .flat_map(|scene| scene.batches.iter().map(|batch| (scene.number, batch.number)))
            .collect()
    }

    pub fn batch_containing_line(&self, number: usize) -> Option<&SubtitleBatch> {
        self.scenes
            .iter()
            .flat_map(|scene| scene.batches.iter())
            .find(|batch| batch.contains_line(number))
    }

    /// Keys of the batches holding any of the given lines, in document order
    pub fn batches_containing_lines(&self, numbers: &[usize]) -> Vec<(usize, usize)> {
        self.scenes
            .iter()
            .flat_map(|scene| scene.batches.iter())
            .filter(|batch| numbers.iter().any(|n| batch.contains_line(*n)))
            .map(|batch| (batch.scene, batch.number))
            .collect()
    }

    pub fn original_line(&self, number: usize) -> Option<&SubtitleLine> {
        self.originals.iter().find(|line| line.number == number)
    }

    pub fn translated_line(&self, number: usize) -> Option<&SubtitleLine> {
        self.translated.iter().find(|line| line.number == number)
    }
}

/// Shared subtitle document
#[derive(Default)]
pub struct SubtitleDocument {
    state: ReentrantMutex<RefCell<DocumentState>>,
}

/// Scoped hold on the document lock. Released when dropped.
pub struct DocumentGuard<'a> {
    guard: ReentrantMutexGuard<'a, RefCell<DocumentState>>,
}

impl DocumentGuard<'_> {
    pub fn state(&self) -> Ref<'_, DocumentState> {
        self.guard.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, DocumentState> {
        self.guard.borrow_mut()
    }
}

impl SubtitleDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unbatched document built from parsed lines
    pub fn from_lines(lines: Vec<SubtitleLine>, metadata: Metadata) -> Self {
        let mut state = DocumentState::default();
        state.set_originals(lines);
        state.metadata = metadata;
        Self::from_state(state)
    }

    pub fn from_scenes(scenes: Vec<SubtitleScene>) -> Self {
        let mut state = DocumentState::default();
        state.set_scenes(scenes);
        Self::from_state(state)
    }

    pub fn from_state(state: DocumentState) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    pub fn with_settings(self, settings: ProjectSettings) -> Self {
        self.write(|state| state.settings = settings);
        self
    }

    /// Acquire the document lock. Reentrant on the same thread.
    pub fn lock(&self) -> DocumentGuard<'_> {
        DocumentGuard {
            guard: self.state.lock(),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DocumentState) -> R) -> R {
        let guard = self.lock();
        let state = guard.state();
        f(&state)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut DocumentState) -> R) -> R {
        let guard = self.lock();
        let mut state = guard.state_mut();
        f(&mut state)
    }

    /// Start an editing session holding the lock until the editor is dropped
    pub fn editor(&self) -> SubtitleEditor<'_> {
        SubtitleEditor::new(self)
    }

    pub fn to_project(&self) -> ProjectFile {
        self.read(|state| ProjectFile {
            scenes: state.scenes.clone(),
            metadata: state.metadata.clone(),
            settings: state.settings.clone(),
        })
    }

    pub fn from_project(project: ProjectFile) -> Self {
        let mut state = DocumentState {
            metadata: project.metadata,
            settings: project.settings,
            ..Default::default()
        };
        state.set_scenes(project.scenes);
        Self::from_state(state)
    }

    /// Write the document as a JSON project file
    pub fn save_project<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(&self.to_project())?;
        fs::write(path.as_ref(), json)?;
        debug!("Saved project to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load_project<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = fs::read_to_string(path.as_ref())?;
        let project: ProjectFile = serde_json::from_str(&content)?;
        Ok(Self::from_project(project))
    }
}
