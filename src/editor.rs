/*!
 * Structural editing of a subtitle document.
 *
 * `SubtitleEditor` holds the document lock for its whole lifetime, so an
 * editing session is a scope: create the editor, perform one or more
 * operations, drop it. An optional exit callback receives `true` when every
 * operation in the session succeeded.
 *
 * Every operation validates its preconditions before touching the document,
 * renumbers scenes and batches when it completes, and returns a record that
 * the matching inverse operation accepts.
 */

use std::cell::{Ref, RefMut};

use log::{debug, warn};

use crate::batcher::{find_split_point, SubtitleBatcher};
use crate::document::{
    DocumentGuard, DocumentState, LineUpdate, Metadata, SubtitleBatch, SubtitleDocument, SubtitleLine,
    SubtitleScene,
};
use crate::errors::{BatchError, SubtitleError};

/// Lines removed from one batch
#[derive(Debug, Clone, PartialEq)]
pub struct LineDeletion {
    pub scene: usize,
    pub batch: usize,
    pub originals: Vec<SubtitleLine>,
    pub translated: Vec<SubtitleLine>,
}

/// Shape of one scene before a merge
#[derive(Debug, Clone, PartialEq)]
pub struct SceneShape {
    pub batch_count: usize,
    pub context: Metadata,
}

/// Undo data for `merge_scenes`
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMerge {
    /// Number of the scene everything was merged into
    pub scene: usize,
    pub scenes: Vec<SceneShape>,
}

/// Shape of one batch before a merge
#[derive(Debug, Clone, PartialEq)]
pub struct BatchShape {
    pub lines: Vec<usize>,
    pub context: Metadata,
    pub errors: Vec<BatchError>,
}

/// Undo data for `merge_batches`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMerge {
    pub scene: usize,
    /// Number of the batch everything was merged into
    pub batch: usize,
    pub batches: Vec<BatchShape>,
}

/// Result and undo data for `merge_lines_in_batch`
#[derive(Debug, Clone, PartialEq)]
pub struct LineMerge {
    pub scene: usize,
    pub batch: usize,
    pub merged: SubtitleLine,
    pub merged_translated: Option<SubtitleLine>,
    pub originals: Vec<SubtitleLine>,
    pub translated: Vec<SubtitleLine>,
}

/// Undo data for `split_scene`
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSplit {
    pub scene: usize,
    pub batch: usize,
}

/// Undo data for `split_batch` and `auto_split_batch`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSplit {
    pub scene: usize,
    pub batch: usize,
    /// First line of the new batch
    pub line_number: usize,
}

/// What `sanitise` removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SanitiseReport {
    pub lines_removed: usize,
    pub orphans_removed: usize,
    pub batches_removed: usize,
    pub scenes_removed: usize,
}

impl SanitiseReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Any reversible edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditRecord {
    DeleteLines(Vec<LineDeletion>),
    MergeScenes(SceneMerge),
    MergeBatches(BatchMerge),
    MergeLines(LineMerge),
    SplitScene(SceneSplit),
    SplitBatch(BatchSplit),
}

type ExitCallback<'a> = Box<dyn FnOnce(bool) + 'a>;

/// Scoped editing session over a document
pub struct SubtitleEditor<'a> {
    guard: DocumentGuard<'a>,
    on_exit: Option<ExitCallback<'a>>,
    failed: bool,
}

impl<'a> SubtitleEditor<'a> {
    pub fn new(document: &'a SubtitleDocument) -> Self {
        Self {
            guard: document.lock(),
            on_exit: None,
            failed: false,
        }
    }

    /// Editor whose callback runs on exit with the session's success flag
    pub fn with_exit_callback(document: &'a SubtitleDocument, callback: impl FnOnce(bool) + 'a) -> Self {
        Self {
            guard: document.lock(),
            on_exit: Some(Box::new(callback)),
            failed: false,
        }
    }

    /// Read access to the document while the session is open
    pub fn state(&self) -> Ref<'_, DocumentState> {
        self.guard.state()
    }

    fn state_mut(&self) -> RefMut<'_, DocumentState> {
        self.guard.state_mut()
    }

    fn track<T>(&mut self, result: Result<T, SubtitleError>) -> Result<T, SubtitleError> {
        if let Err(error) = &result {
            debug!("Edit failed: {}", error);
            self.failed = true;
        }
        result
    }

    fn finish(state: &mut DocumentState) {
        state.renumber_scenes();
        state.refresh();
    }

    /// Replace the scene structure with a fresh batching of the current lines,
    /// keeping any existing translations
    pub fn auto_batch(&mut self, batcher: &SubtitleBatcher) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            auto_batch(&mut state, batcher)
        };
        self.track(result)
    }

    pub fn add_scene(&mut self, scene: SubtitleScene) {
        let mut state = self.state_mut();
        state.scenes_mut().push(scene);
        Self::finish(&mut state);
    }

    pub fn renumber_scenes(&mut self) {
        let mut state = self.state_mut();
        Self::finish(&mut state);
    }

    /// Patch a scene's context. Null values remove keys.
    pub fn update_scene(&mut self, scene: usize, context: &Metadata) -> Result<bool, SubtitleError> {
        let result = self.state_mut().scene_mut(scene).map(|scene| scene.update_context(context));
        self.track(result)
    }

    /// Patch a batch's context. Null values remove keys.
    pub fn update_batch(&mut self, scene: usize, batch: usize, context: &Metadata) -> Result<bool, SubtitleError> {
        let result = self
            .state_mut()
            .batch_mut(scene, batch)
            .map(|batch| batch.update_context(context));
        self.track(result)
    }

    /// Apply field updates to an original line. Returns whether anything changed.
    pub fn update_line(&mut self, number: usize, updates: &[LineUpdate]) -> Result<bool, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            update_line(&mut state, number, updates)
        };
        self.track(result)
    }

    /// Remove lines (and their translations) from every batch containing them
    pub fn delete_lines(&mut self, numbers: &[usize]) -> Result<Vec<LineDeletion>, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            delete_lines(&mut state, numbers)
        };
        self.track(result)
    }

    /// Inverse of `delete_lines`
    pub fn restore_lines(&mut self, deletions: &[LineDeletion]) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            restore_lines(&mut state, deletions)
        };
        self.track(result)
    }

    /// Collapse a contiguous run of scenes into the first of them
    pub fn merge_scenes(&mut self, numbers: &[usize]) -> Result<SceneMerge, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            merge_scenes(&mut state, numbers)
        };
        self.track(result)
    }

    /// Inverse of `merge_scenes`
    pub fn unmerge_scenes(&mut self, merge: &SceneMerge) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            unmerge_scenes(&mut state, merge)
        };
        self.track(result)
    }

    /// Collapse a contiguous run of batches within a scene into the first of them
    pub fn merge_batches(&mut self, scene: usize, numbers: &[usize]) -> Result<BatchMerge, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            merge_batches(&mut state, scene, numbers)
        };
        self.track(result)
    }

    /// Inverse of `merge_batches`
    pub fn unmerge_batches(&mut self, merge: &BatchMerge) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            unmerge_batches(&mut state, merge)
        };
        self.track(result)
    }

    /// Collapse contiguous lines within a batch into one line
    pub fn merge_lines_in_batch(
        &mut self,
        scene: usize,
        batch: usize,
        numbers: &[usize],
    ) -> Result<LineMerge, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            merge_lines_in_batch(&mut state, scene, batch, numbers)
        };
        self.track(result)
    }

    /// Inverse of `merge_lines_in_batch`
    pub fn unmerge_lines(&mut self, merge: &LineMerge) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            unmerge_lines(&mut state, merge)
        };
        self.track(result)
    }

    /// Move batches from `batch` onward into a new scene after `scene`
    pub fn split_scene(&mut self, scene: usize, batch: usize) -> Result<SceneSplit, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            split_scene(&mut state, scene, batch)
        };
        self.track(result)
    }

    /// Inverse of `split_scene`
    pub fn unsplit_scene(&mut self, split: &SceneSplit) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            merge_adjacent_scenes(&mut state, split.scene)
        };
        self.track(result)
    }

    /// Split a batch so that `line_number` starts a new batch
    pub fn split_batch(
        &mut self,
        scene: usize,
        batch: usize,
        line_number: usize,
        translated_line_number: Option<usize>,
    ) -> Result<BatchSplit, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            split_batch(&mut state, scene, batch, line_number, translated_line_number)
        };
        self.track(result)
    }

    /// Split a batch at its largest pause, keeping at least `min_batch_size` lines each side
    pub fn auto_split_batch(
        &mut self,
        scene: usize,
        batch: usize,
        min_batch_size: usize,
    ) -> Result<BatchSplit, SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            auto_split_batch(&mut state, scene, batch, min_batch_size)
        };
        self.track(result)
    }

    /// Inverse of `split_batch` and `auto_split_batch`
    pub fn unsplit_batch(&mut self, split: &BatchSplit) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            merge_adjacent_batches(&mut state, split.scene, split.batch)
        };
        self.track(result)
    }

    /// Drop invalid lines, orphaned translations and empty containers
    pub fn sanitise(&mut self) -> SanitiseReport {
        let mut state = self.state_mut();
        sanitise(&mut state)
    }

    /// Copy every original line into the translations
    pub fn duplicate_originals_as_translations(&mut self) -> Result<(), SubtitleError> {
        let result = {
            let mut state = self.state_mut();
            duplicate_originals_as_translations(&mut state)
        };
        self.track(result)
    }

    /// Reverse a previously returned edit record
    pub fn undo(&mut self, record: &EditRecord) -> Result<(), SubtitleError> {
        match record {
            EditRecord::DeleteLines(deletions) => self.restore_lines(deletions),
            EditRecord::MergeScenes(merge) => self.unmerge_scenes(merge),
            EditRecord::MergeBatches(merge) => self.unmerge_batches(merge),
            EditRecord::MergeLines(merge) => self.unmerge_lines(merge),
            EditRecord::SplitScene(split) => self.unsplit_scene(split),
            EditRecord::SplitBatch(split) => self.unsplit_batch(split),
        }
    }
}

impl Drop for SubtitleEditor<'_> {
    fn drop(&mut self) {
        let success = !self.failed && !std::thread::panicking();
        if let Some(callback) = self.on_exit.take() {
            callback(success);
        }
    }
}

/// Sorted, deduplicated copy of `numbers` if it forms a contiguous run
fn contiguous(numbers: &[usize], what: &str) -> Result<Vec<usize>, SubtitleError> {
    if numbers.is_empty() {
        return Err(SubtitleError::structure(format!("No {} numbers supplied", what)));
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.windows(2).any(|pair| pair[1] != pair[0] + 1) {
        return Err(SubtitleError::structure(format!(
            "{} numbers to be merged are not sequential",
            capitalise(what)
        )));
    }
    Ok(sorted)
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn auto_batch(state: &mut DocumentState, batcher: &SubtitleBatcher) -> Result<(), SubtitleError> {
    if state.originals().is_empty() {
        return Err(SubtitleError::structure("No subtitles to batch"));
    }

    let translated = state.translated().to_vec();
    let mut scenes = batcher.batch_subtitles(state.originals());
    for batch in scenes.iter_mut().flat_map(|scene| scene.batches.iter_mut()) {
        for line in &translated {
            if batch.contains_line(line.number) {
                batch.set_translated_line(line.clone());
            }
        }
    }

    state.set_scenes(scenes);
    Ok(())
}

fn update_line(state: &mut DocumentState, number: usize, updates: &[LineUpdate]) -> Result<bool, SubtitleError> {
    let (scene, batch) = state
        .batch_containing_line(number)
        .map(|batch| (batch.scene, batch.number))
        .ok_or(SubtitleError::LineNotFound(number))?;

    let batch = state.batch_mut(scene, batch)?;
    let mut line = batch
        .original_line(number)
        .cloned()
        .ok_or(SubtitleError::LineNotFound(number))?;

    let mut changed = false;
    for update in updates {
        changed |= line.apply(update);
    }

    // Only a retiming update is held to end > start
    let retimed = updates
        .iter()
        .any(|update| matches!(update, LineUpdate::Timing { .. }));
    if let (Some(start), Some(end)) = (line.start_ms, line.end_ms) {
        if retimed && end <= start {
            return Err(SubtitleError::structure(format!(
                "Line {} would end before it starts",
                number
            )));
        }
    }

    if !changed {
        return Ok(false);
    }

    let clears_translation = updates
        .iter()
        .any(|update| matches!(update, LineUpdate::Translation(None)));

    match (line.translation.clone(), batch.translated_line(number).cloned()) {
        (Some(text), Some(existing)) => {
            batch.set_translated_line(SubtitleLine {
                text,
                start_ms: line.start_ms,
                end_ms: line.end_ms,
                ..existing
            });
        }
        (Some(text), None) => {
            batch.set_translated_line(line.translated_copy(text));
        }
        (None, Some(_)) if clears_translation => {
            batch.remove_translated_line(number);
        }
        (None, Some(existing)) => {
            batch.set_translated_line(SubtitleLine {
                start_ms: line.start_ms,
                end_ms: line.end_ms,
                ..existing
            });
        }
        (None, None) => {}
    }

    if let Some(original) = batch.original_line_mut(number) {
        *original = line;
    }

    state.refresh();
    Ok(true)
}

fn delete_lines(state: &mut DocumentState, numbers: &[usize]) -> Result<Vec<LineDeletion>, SubtitleError> {
    if numbers.is_empty() {
        return Err(SubtitleError::structure("No line numbers supplied"));
    }

    let mut deletions = Vec::new();
    for scene in state.scenes_mut().iter_mut() {
        for batch in scene.batches.iter_mut() {
            let (originals, translated) = batch.delete_lines(numbers);
            if !originals.is_empty() || !translated.is_empty() {
                deletions.push(LineDeletion {
                    scene: batch.scene,
                    batch: batch.number,
                    originals,
                    translated,
                });
            }
        }
    }

    if deletions.is_empty() {
        return Err(SubtitleError::structure("No lines were deleted from any batches"));
    }

    SubtitleEditor::finish(state);
    Ok(deletions)
}

fn restore_lines(state: &mut DocumentState, deletions: &[LineDeletion]) -> Result<(), SubtitleError> {
    for deletion in deletions {
        state.batch(deletion.scene, deletion.batch)?;
    }

    for deletion in deletions {
        let batch = state.batch_mut(deletion.scene, deletion.batch)?;
        batch.insert_lines(deletion.originals.clone(), deletion.translated.clone());
    }

    SubtitleEditor::finish(state);
    Ok(())
}

fn merge_scenes(state: &mut DocumentState, numbers: &[usize]) -> Result<SceneMerge, SubtitleError> {
    let numbers = contiguous(numbers, "scene")?;
    for number in &numbers {
        state.scene(*number)?;
    }

    let first = state.scene_index(numbers[0])?;
    let shapes = state.scenes()[first..first + numbers.len()]
        .iter()
        .map(|scene| SceneShape {
            batch_count: scene.size(),
            context: scene.context.clone(),
        })
        .collect();

    let scenes = state.scenes_mut();
    let merged: Vec<SubtitleScene> = scenes.drain(first + 1..first + numbers.len()).collect();
    for scene in merged {
        scenes[first].absorb(scene);
    }

    SubtitleEditor::finish(state);
    Ok(SceneMerge {
        scene: numbers[0],
        scenes: shapes,
    })
}

fn unmerge_scenes(state: &mut DocumentState, merge: &SceneMerge) -> Result<(), SubtitleError> {
    let index = state.scene_index(merge.scene)?;
    let expected: usize = merge.scenes.iter().map(|shape| shape.batch_count).sum();
    if state.scenes()[index].size() != expected {
        return Err(SubtitleError::structure(format!(
            "Scene {} no longer matches the merge being undone",
            merge.scene
        )));
    }

    let scenes = state.scenes_mut();
    let mut remaining = std::mem::take(&mut scenes[index].batches);
    let mut restored = Vec::with_capacity(merge.scenes.len());
    for shape in &merge.scenes {
        let rest = remaining.split_off(shape.batch_count);
        let mut scene = SubtitleScene::with_batches(0, remaining);
        scene.context = shape.context.clone();
        restored.push(scene);
        remaining = rest;
    }

    scenes.splice(index..=index, restored);
    SubtitleEditor::finish(state);
    Ok(())
}

fn merge_batches(state: &mut DocumentState, scene: usize, numbers: &[usize]) -> Result<BatchMerge, SubtitleError> {
    let numbers = contiguous(numbers, "batch")?;
    let target = state.scene_mut(scene)?;
    for number in &numbers {
        target.batch(*number)?;
    }

    let first = target.batch_index(numbers[0])?;
    let shapes = target.batches[first..first + numbers.len()]
        .iter()
        .map(|batch| BatchShape {
            lines: batch.originals.iter().map(|line| line.number).collect(),
            context: batch.context.clone(),
            errors: batch.errors.clone(),
        })
        .collect();

    let merged: Vec<_> = target.batches.drain(first + 1..first + numbers.len()).collect();
    for batch in merged {
        target.batches[first].absorb(batch);
    }

    SubtitleEditor::finish(state);
    Ok(BatchMerge {
        scene,
        batch: numbers[0],
        batches: shapes,
    })
}

fn unmerge_batches(state: &mut DocumentState, merge: &BatchMerge) -> Result<(), SubtitleError> {
    let target = state.scene_mut(merge.scene)?;
    let index = target.batch_index(merge.batch)?;

    let expected: usize = merge.batches.iter().map(|shape| shape.lines.len()).sum();
    if target.batches[index].size() != expected {
        return Err(SubtitleError::structure(format!(
            "Batch ({},{}) no longer matches the merge being undone",
            merge.scene, merge.batch
        )));
    }

    let merged = target.batches.remove(index);
    let mut originals = merged.originals;
    let mut translated = merged.translated;
    let mut restored = Vec::with_capacity(merge.batches.len());
    for shape in &merge.batches {
        let (mine, rest): (Vec<_>, Vec<_>) = originals
            .into_iter()
            .partition(|line| shape.lines.contains(&line.number));
        originals = rest;
        let (mine_translated, rest_translated): (Vec<_>, Vec<_>) = translated
            .into_iter()
            .partition(|line| shape.lines.contains(&line.number));
        translated = rest_translated;

        let mut batch = SubtitleBatch::new(merge.scene, 0, mine);
        batch.translated = mine_translated;
        batch.context = shape.context.clone();
        batch.errors = shape.errors.clone();
        restored.push(batch);
    }

    target.batches.splice(index..index, restored);
    SubtitleEditor::finish(state);
    Ok(())
}

fn merge_lines_in_batch(
    state: &mut DocumentState,
    scene: usize,
    batch: usize,
    numbers: &[usize],
) -> Result<LineMerge, SubtitleError> {
    if numbers.is_empty() {
        return Err(SubtitleError::structure("No line numbers supplied"));
    }

    let merged = state.batch_mut(scene, batch)?.merge_lines(numbers)?;

    SubtitleEditor::finish(state);
    Ok(LineMerge {
        scene,
        batch,
        merged: merged.merged,
        merged_translated: merged.merged_translated,
        originals: merged.originals,
        translated: merged.translated,
    })
}

fn unmerge_lines(state: &mut DocumentState, merge: &LineMerge) -> Result<(), SubtitleError> {
    let batch = state.batch_mut(merge.scene, merge.batch)?;
    if !batch.contains_line(merge.merged.number) {
        return Err(SubtitleError::LineNotFound(merge.merged.number));
    }

    batch.delete_lines(&[merge.merged.number]);
    batch.insert_lines(merge.originals.clone(), merge.translated.clone());

    SubtitleEditor::finish(state);
    Ok(())
}

fn split_scene(state: &mut DocumentState, scene: usize, batch: usize) -> Result<SceneSplit, SubtitleError> {
    let index = state.scene_index(scene)?;
    let batch_index = state.scenes()[index].batch_index(batch)?;
    if batch_index == 0 {
        return Err(SubtitleError::structure(format!(
            "Cannot split scene {} at its first batch",
            scene
        )));
    }

    let scenes = state.scenes_mut();
    let tail = scenes[index].batches.split_off(batch_index);
    scenes.insert(index + 1, SubtitleScene::with_batches(scene + 1, tail));

    SubtitleEditor::finish(state);
    Ok(SceneSplit { scene, batch })
}

fn merge_adjacent_scenes(state: &mut DocumentState, scene: usize) -> Result<(), SubtitleError> {
    let index = state.scene_index(scene)?;
    if index + 1 >= state.scene_count() {
        return Err(SubtitleError::SceneNotFound(scene + 1));
    }

    let scenes = state.scenes_mut();
    let next = scenes.remove(index + 1);
    scenes[index].absorb(next);

    SubtitleEditor::finish(state);
    Ok(())
}

fn split_batch(
    state: &mut DocumentState,
    scene: usize,
    batch: usize,
    line_number: usize,
    translated_line_number: Option<usize>,
) -> Result<BatchSplit, SubtitleError> {
    let target = state.scene_mut(scene)?;
    let index = target.batch_index(batch)?;

    let tail = target.batches[index].split_at_line(line_number, translated_line_number)?;
    target.batches.insert(index + 1, tail);

    SubtitleEditor::finish(state);
    Ok(BatchSplit {
        scene,
        batch,
        line_number,
    })
}

fn auto_split_batch(
    state: &mut DocumentState,
    scene: usize,
    batch: usize,
    min_batch_size: usize,
) -> Result<BatchSplit, SubtitleError> {
    let target = state.batch(scene, batch)?;
    let index = find_split_point(&target.originals, min_batch_size).ok_or_else(|| {
        SubtitleError::structure(format!(
            "Batch ({},{}) is too small to split with a minimum batch size of {}",
            scene, batch, min_batch_size
        ))
    })?;
    let line_number = target.originals[index].number;

    split_batch(state, scene, batch, line_number, None)
}

fn merge_adjacent_batches(state: &mut DocumentState, scene: usize, batch: usize) -> Result<(), SubtitleError> {
    let target = state.scene_mut(scene)?;
    let index = target.batch_index(batch)?;
    if index + 1 >= target.size() {
        return Err(SubtitleError::BatchNotFound {
            scene,
            batch: batch + 1,
        });
    }

    let next = target.batches.remove(index + 1);
    target.batches[index].absorb(next);

    SubtitleEditor::finish(state);
    Ok(())
}

fn sanitise(state: &mut DocumentState) -> SanitiseReport {
    let mut report = SanitiseReport::default();
    if !state.has_scenes() {
        return report;
    }

    for scene in state.scenes_mut().iter_mut() {
        for batch in scene.batches.iter_mut() {
            let before = batch.originals.len();
            batch.originals.retain(SubtitleLine::is_valid);
            report.lines_removed += before - batch.originals.len();

            let before = batch.translated.len();
            batch.translated.retain(SubtitleLine::is_valid);
            report.lines_removed += before - batch.translated.len();

            let orphans = batch.remove_orphaned_translations();
            if !orphans.is_empty() {
                warn!(
                    "Removing {} translated line(s) with no matching original in batch ({},{})",
                    orphans.len(),
                    batch.scene,
                    batch.number
                );
                report.orphans_removed += orphans.len();
            }
        }

        let before = scene.batches.len();
        scene.batches.retain(|batch| !batch.is_empty());
        report.batches_removed += before - scene.batches.len();
    }

    let scenes = state.scenes_mut();
    let before = scenes.len();
    scenes.retain(|scene| !scene.batches.is_empty());
    report.scenes_removed = before - scenes.len();

    if !report.is_empty() {
        debug!("Sanitised document: {:?}", report);
    }

    SubtitleEditor::finish(state);
    report
}

fn duplicate_originals_as_translations(state: &mut DocumentState) -> Result<(), SubtitleError> {
    if state.any_translated() {
        return Err(SubtitleError::structure("Translations already exist"));
    }
    if !state.has_scenes() {
        return Err(SubtitleError::structure("No subtitles to duplicate"));
    }

    for batch in state.scenes_mut().iter_mut().flat_map(|scene| scene.batches.iter_mut()) {
        let copies: Vec<SubtitleLine> = batch
            .originals
            .iter()
            .map(|line| line.translated_copy(line.text.clone()))
            .collect();
        for line in copies {
            batch.set_translated_line(line);
        }
    }

    SubtitleEditor::finish(state);
    Ok(())
}
