/*!
 * End-to-end project workflow: batch a subtitle file, translate it, validate
 * the result and write it back out
 */

use std::fs;
use std::path::Path;

use subtrans::app_config::Config;
use subtrans::app_controller::{Controller, TranslateOptions};
use subtrans::document::SubtitleDocument;
use subtrans::errors::ValidationError;

use crate::common;

fn mock_config() -> Config {
    let mut config = Config::default();
    config.translation.provider = "mock".to_string();
    config.translation.provider_config_mut("mock");
    config.translation.common.backoff_time_ms = 1;
    config
}

fn mock_options() -> TranslateOptions {
    TranslateOptions {
        progress: false,
        ..Default::default()
    }
}

fn batched_project(controller: &Controller, dir: &Path) -> std::path::PathBuf {
    let input = common::create_test_subtitle(dir, "sample.srt").unwrap();
    controller.batch_file(&input, None).unwrap()
}

#[tokio::test]
async fn test_controller_fullWorkflow_shouldProduceTranslatedSrt() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(mock_config()).unwrap();

    let project = batched_project(&controller, dir.path());
    assert_eq!(project, dir.path().join("sample.subtrans.json"));
    let document = SubtitleDocument::load_project(&project).unwrap();
    assert_eq!(common::document_shape(&document), vec![(1, vec![(1, 3)]), (2, vec![(1, 3)])]);
    document.read(|state| assert_eq!(state.metadata["format"], "srt"));

    let report = controller.translate_project(&project, mock_options()).await.unwrap();
    assert_eq!(report.batches_translated, 2);
    assert_eq!(report.lines_translated, 6);

    let problems = controller.validate_project(&project).unwrap();
    assert!(problems.is_empty());

    let output = controller.compose(&project, None, false).unwrap();
    assert_eq!(output, dir.path().join("sample.subtrans.translated.srt"));
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("1\n00:00:01,000 --> 00:00:04,000\n[translated] This is a test subtitle.\n\n"));
    assert!(content.contains("6\n00:01:36,000 --> 00:01:38,000\n[translated] And a third.\n"));

    let original = controller.compose(&project, None, true).unwrap();
    assert!(fs::read_to_string(original).unwrap().contains("\nA new scene begins.\n"));
}

#[tokio::test]
async fn test_controller_translateProject_withSceneFilter_shouldLeaveOtherScenesForValidation() {
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(mock_config()).unwrap();
    let project = batched_project(&controller, dir.path());

    let options = TranslateOptions {
        scenes: Some(vec![2]),
        ..mock_options()
    };
    controller.translate_project(&project, options).await.unwrap();

    let problems = controller.validate_project(&project).unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!((problems[0].scene, problems[0].batch), (1, 1));
    assert_eq!(problems[0].errors, vec![ValidationError::UntranslatedLines { lines: Vec::new() }]);

    let output = dir.path().join("mixed.srt");
    controller.compose(&project, Some(&output), false).unwrap();
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("\nThis is a test subtitle.\n"));
    assert!(content.contains("\n[translated] A new scene begins.\n"));
}

#[tokio::test]
async fn test_controller_translateProject_whenAborted_shouldStillSaveProject() {
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(mock_config()).unwrap();
    let project = batched_project(&controller, dir.path());
    let before = fs::read_to_string(&project).unwrap();

    controller.abort_handle().abort();
    let result = controller.translate_project(&project, mock_options()).await;

    assert!(result.is_err());
    let document = SubtitleDocument::load_project(&project).unwrap();
    document.read(|state| {
        assert_eq!(state.line_count(), 6);
        assert!(!state.any_translated());
    });
    assert!(!fs::read_to_string(&project).unwrap().is_empty());
    assert!(!before.is_empty());
}

#[tokio::test]
async fn test_controller_translateProject_withUnknownProvider_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(mock_config()).unwrap();
    let project = batched_project(&controller, dir.path());

    let options = TranslateOptions {
        provider: Some("carrier-pigeon".to_string()),
        ..mock_options()
    };
    let error = controller.translate_project(&project, options).await.unwrap_err();

    assert!(format!("{:#}", error).contains("Unknown provider"));
}

#[test]
fn test_controller_batchFile_withUnsupportedFormat_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(mock_config()).unwrap();
    let input = common::create_test_file(dir.path(), "notes.txt", "hello").unwrap();

    assert!(controller.batch_file(&input, None).is_err());
}

#[test]
fn test_controller_withConfig_withInvalidBatching_shouldFail() {
    let mut config = mock_config();
    config.batching.max_batch_size = 0;

    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_subtitleDocument_saveAndLoadProject_shouldRoundTrip() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("project.json");
    let document = common::document_from_line_counts(&[&[2, 1], &[3]]);
    document.write(|state| {
        state.settings.movie_name = Some("Heat".to_string());
        state.scene_mut(2).unwrap().set_summary(Some("The heist".to_string()));
    });
    document.editor().duplicate_originals_as_translations().unwrap();

    document.save_project(&path).unwrap();
    let loaded = SubtitleDocument::load_project(&path).unwrap();

    assert_eq!(loaded.to_project(), document.to_project());
    loaded.read(|state| {
        assert_eq!(state.line_count(), 6);
        assert_eq!(state.translated().len(), 6);
        assert_eq!(state.scene(2).unwrap().summary(), Some("The heist"));
    });
}
