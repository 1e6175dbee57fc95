/*!
 * Tests for structural edits and their undo records
 */

use std::cell::Cell;

use subtrans::document::{LineUpdate, SubtitleBuilder, SubtitleLine};
use subtrans::editor::{EditRecord, SubtitleEditor};
use subtrans::errors::SubtitleError;

use crate::common::{self, document_from_line_counts, document_shape};

fn assert_sequential(document: &subtrans::SubtitleDocument) {
    document.read(|state| {
        for (scene_index, scene) in state.scenes().iter().enumerate() {
            assert_eq!(scene.number, scene_index + 1);
            for (batch_index, batch) in scene.batches.iter().enumerate() {
                assert_eq!(batch.number, batch_index + 1);
                assert_eq!(batch.scene, scene.number);
            }
        }
        let numbers: Vec<usize> = state.originals().iter().map(|line| line.number).collect();
        assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
    });
}

#[test]
fn test_editor_deleteLines_thenSanitise_shouldBeNoOp() {
    let document = SubtitleBuilder::new()
        .add_scene(None)
        .add_batch(None)
        .build_line(0, 1_000, "One")
        .build_line(1_500, 2_500, "Two")
        .build_line(3_000, 4_000, "Three")
        .build();
    let mut editor = document.editor();

    let deletions = editor.delete_lines(&[2]).unwrap();
    let report = editor.sanitise();
    drop(editor);

    assert_eq!(deletions.len(), 1);
    assert_eq!((deletions[0].scene, deletions[0].batch), (1, 1));
    assert_eq!(deletions[0].originals[0].number, 2);
    assert!(report.is_empty());
    document.read(|state| {
        let numbers: Vec<usize> = state.originals().iter().map(|line| line.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(state.scene_count(), 1);
    });
}

#[test]
fn test_editor_deleteLines_thenRestore_shouldReturnLines() {
    let document = document_from_line_counts(&[&[3, 3]]);
    let mut editor = document.editor();

    let deletions = editor.delete_lines(&[3, 4]).unwrap();
    assert_eq!(deletions.len(), 2);

    editor.undo(&EditRecord::DeleteLines(deletions)).unwrap();
    drop(editor);

    assert_eq!(document_shape(&document), vec![(1, vec![(1, 3), (2, 3)])]);
    assert_sequential(&document);
}

#[test]
fn test_editor_mergeScenes_thenUnmerge_shouldRestoreNumberingAndSizes() {
    let document = document_from_line_counts(&[&[2], &[3, 1], &[4], &[2]]);
    let before = document_shape(&document);
    let line_count = document.read(|state| state.line_count());
    let mut editor = document.editor();

    let merge = editor.merge_scenes(&[2, 3]).unwrap();
    assert_eq!(editor.state().scene_count(), 3);
    assert_eq!(editor.state().scene(2).unwrap().size(), 3);

    editor.unmerge_scenes(&merge).unwrap();
    drop(editor);

    assert_eq!(document_shape(&document), before);
    assert_eq!(document.read(|state| state.line_count()), line_count);
}

#[test]
fn test_editor_mergeScenes_withNonSequentialNumbers_shouldNotMutate() {
    let document = document_from_line_counts(&[&[2], &[2], &[2]]);
    let before = document_shape(&document);

    let error = document.editor().merge_scenes(&[1, 3]).err().unwrap();

    assert!(matches!(error, SubtitleError::Structure(_)));
    assert_eq!(document_shape(&document), before);
}

#[test]
fn test_editor_mergeBatches_shouldConcatenateLines() {
    let document = document_from_line_counts(&[&[2, 3, 1]]);

    let merge = document.editor().merge_batches(1, &[2, 3]).unwrap();

    assert_eq!(merge.batches.len(), 2);
    assert_eq!(document_shape(&document), vec![(1, vec![(1, 2), (2, 4)])]);
}

#[test]
fn test_editor_mergeLinesInBatch_thenUnmerge_shouldRestoreLines() {
    let document = document_from_line_counts(&[&[4]]);
    let mut editor = document.editor();

    let merge = editor.merge_lines_in_batch(1, 1, &[2, 3]).unwrap();
    assert_eq!(merge.merged.text, "Line 2\nLine 3");
    assert_eq!(editor.state().line_count(), 3);

    editor.unmerge_lines(&merge).unwrap();
    drop(editor);

    document.read(|state| {
        let texts: Vec<&str> = state.originals().iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["Line 1", "Line 2", "Line 3", "Line 4"]);
    });
}

#[test]
fn test_editor_splitScene_atFirstBatch_shouldFail() {
    let document = document_from_line_counts(&[&[2, 2]]);

    assert!(document.editor().split_scene(1, 1).is_err());
    assert_eq!(document_shape(&document), vec![(1, vec![(1, 2), (2, 2)])]);
}

#[test]
fn test_editor_splitScene_thenUnsplit_shouldRestoreShape() {
    let document = document_from_line_counts(&[&[2, 2, 2], &[1]]);
    let before = document_shape(&document);
    let mut editor = document.editor();

    let split = editor.split_scene(1, 2).unwrap();
    drop(editor);
    assert_eq!(
        document_shape(&document),
        vec![(1, vec![(1, 2)]), (2, vec![(1, 2), (2, 2)]), (3, vec![(1, 1)])]
    );

    document.editor().undo(&EditRecord::SplitScene(split)).unwrap();
    assert_eq!(document_shape(&document), before);
}

#[test]
fn test_editor_autoSplitBatch_shouldSplitAtLargestGap() {
    let document = SubtitleBuilder::new()
        .add_scene(None)
        .add_batch(None)
        .build_line(0, 1_000, "One")
        .build_line(1_100, 2_000, "Two")
        .build_line(9_000, 10_000, "Three")
        .build_line(10_100, 11_000, "Four")
        .build();

    let split = document.editor().auto_split_batch(1, 1, 1).unwrap();

    assert_eq!(split.line_number, 3);
    assert_eq!(document_shape(&document), vec![(1, vec![(1, 2), (2, 2)])]);
}

#[test]
fn test_editor_operationSequence_shouldKeepNumberingSequential() {
    let document = document_from_line_counts(&[&[3, 3], &[2], &[4, 2], &[3]]);
    let mut editor = document.editor();

    editor.merge_scenes(&[2, 3]).unwrap();
    editor.split_batch(1, 2, 5, None).unwrap();
    editor.delete_lines(&[1, 2, 3]).unwrap();
    editor.sanitise();
    editor.merge_batches(2, &[1, 2]).unwrap();
    editor.split_scene(2, 2).unwrap();
    drop(editor);

    assert_sequential(&document);
}

#[test]
fn test_editor_updateLine_withSameValues_shouldReturnFalse() {
    let document = document_from_line_counts(&[&[2]]);
    let mut editor = document.editor();

    let changed = editor
        .update_line(1, &[LineUpdate::Text("Line 1".to_string())])
        .unwrap();

    assert!(!changed);
}

#[test]
fn test_editor_updateLine_withTranslation_shouldCreateTranslatedLine() {
    let document = document_from_line_counts(&[&[2]]);

    let changed = document
        .editor()
        .update_line(2, &[LineUpdate::Translation(Some("Ligne 2".to_string()))])
        .unwrap();

    assert!(changed);
    document.read(|state| {
        let translated = state.translated_line(2).unwrap();
        assert_eq!(translated.text, "Ligne 2");
        assert_eq!(translated.start_ms, state.original_line(2).unwrap().start_ms);
    });
}

#[test]
fn test_editor_updateLine_withTextOnly_shouldNotRecheckTiming() {
    let document = SubtitleBuilder::new()
        .add_scene(None)
        .add_batch(None)
        .build_line(1_000, 1_000, "Blink")
        .build();
    let mut editor = document.editor();

    let changed = editor.update_line(1, &[LineUpdate::Text("Hello".to_string())]).unwrap();
    assert!(changed);

    let retimed = editor
        .update_line(
            1,
            &[LineUpdate::Timing {
                start_ms: None,
                end_ms: Some(2_000),
            }],
        )
        .unwrap();
    assert!(retimed);
    drop(editor);

    document.read(|state| {
        let line = state.original_line(1).unwrap();
        assert_eq!(line.text, "Hello");
        assert_eq!(line.end_ms, Some(2_000));
    });
}

#[test]
fn test_editor_updateLine_withBackwardsTiming_shouldFailWithoutChanges() {
    let document = document_from_line_counts(&[&[2]]);
    let before = document.read(|state| state.original_line(1).cloned().unwrap());

    let result = document.editor().update_line(
        1,
        &[LineUpdate::Timing {
            start_ms: None,
            end_ms: Some(0),
        }],
    );

    assert!(matches!(result, Err(SubtitleError::Structure(_))));
    document.read(|state| assert_eq!(state.original_line(1), Some(&before)));
}

#[test]
fn test_editor_sanitise_shouldDropUntimedTranslations() {
    let document = document_from_line_counts(&[&[2]]);
    document.write(|state| {
        let batch = state.batch_mut(1, 1).unwrap();
        batch.translated.push(SubtitleLine::untimed(2, "Deux"));
    });

    let report = document.editor().sanitise();

    assert_eq!(report.lines_removed, 1);
    document.read(|state| {
        assert!(state.translated_line(2).is_none());
        assert_eq!(state.line_count(), 2);
    });
}

#[test]
fn test_editor_exitCallback_shouldReceiveSuccessFlag() {
    let document = document_from_line_counts(&[&[2]]);
    let outcome = Cell::new(None);

    {
        let mut editor = SubtitleEditor::with_exit_callback(&document, |success| outcome.set(Some(success)));
        editor.renumber_scenes();
    }
    assert_eq!(outcome.get(), Some(true));

    {
        let mut editor = SubtitleEditor::with_exit_callback(&document, |success| outcome.set(Some(success)));
        let _ = editor.delete_lines(&[99]);
    }
    assert_eq!(outcome.get(), Some(false));
}

#[test]
fn test_editor_autoBatch_shouldKeepExistingTranslations() {
    common::init_logging();
    let document = document_from_line_counts(&[&[4]]);
    document.editor().duplicate_originals_as_translations().unwrap();
    let batcher = subtrans::SubtitleBatcher::new(subtrans::BatcherConfig {
        scene_threshold_ms: 30_000,
        min_batch_size: 1,
        max_batch_size: 2,
        prevent_overlap: true,
    })
    .unwrap();

    document.editor().auto_batch(&batcher).unwrap();

    document.read(|state| {
        assert_eq!(state.scene_count(), 1);
        assert!(state.scenes()[0].size() >= 2);
        assert!(state.scenes()[0].batches.iter().all(|batch| batch.size() <= 2));
        assert_eq!(state.translated().len(), 4);
        assert!(state.all_translated());
    });
}
