/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use subtrans::app_config::{Config, LogLevel, ProviderConfig};
use subtrans::translation::TranslatorOptions;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.translation.provider, "ollama");
    let ollama = config
        .translation
        .get_active_provider_config()
        .expect("Ollama provider config should exist");
    assert_eq!(ollama.model, "llama3.2:3b");
    assert_eq!(ollama.endpoint, "http://localhost:11434");
    assert_eq!(ollama.timeout_secs, 120);

    assert_eq!(config.batching.scene_threshold_ms, 30_000);
    assert_eq!(config.batching.min_batch_size, 10);
    assert_eq!(config.batching.max_batch_size, 30);
    assert_eq!(config.validation.max_newlines, Some(2));
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_config_saveAndLoad_shouldRoundTrip() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.project.target_language = Some("German".to_string());
    config.translation.common.max_retries = 7;
    config.translation.provider_config_mut("mock").rate_limit = Some(30);
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.translation.get_provider_config("mock").unwrap().rate_limit, Some(30));
}

#[test]
fn test_config_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("missing.json");

    let config = Config::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(Config::from_file(&path).unwrap(), config);
}

#[test]
fn test_config_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "broken.json", "{ not json").unwrap();

    let error = Config::from_file(&path).unwrap_err();

    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_config_validate_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.batching.min_batch_size = 50;
    assert!(config.validate().is_err());
    config.batching.min_batch_size = 10;

    config.translation.common.temperature = 3.5;
    assert!(config.validate().is_err());
    config.translation.common.temperature = 0.7;
    assert!(config.validate().is_ok());

    config.translation.provider = "mock".to_string();
    assert!(config.validate().is_err());
    config.translation.provider_config_mut("mock");
    assert!(config.validate().is_ok());
}

#[test]
fn test_providerConfig_new_withUnknownType_shouldUseNameAsModel() {
    let settings = ProviderConfig::new("mock");

    assert_eq!(settings.provider_type, "mock");
    assert_eq!(settings.model, "mock");
    assert!(settings.supports_streaming);
    assert_eq!(settings.rate_limit, None);
}

#[test]
fn test_translatorOptions_fromCommonConfig_shouldConvertBackoff() {
    let mut config = Config::default();
    config.translation.common.backoff_time_ms = 250;
    config.translation.common.retry_on_error = true;

    let options = TranslatorOptions::from(&config.translation.common);

    assert_eq!(options.backoff_time, Duration::from_millis(250));
    assert!(options.retry_on_error);
    assert_eq!(options.max_history_lines, 5);
}
