use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::batcher::BatcherConfig;
use crate::document::ProjectSettings;
use crate::translation::prompt::{DEFAULT_INSTRUCTIONS, DEFAULT_RETRY_INSTRUCTIONS};
use crate::validation::ValidationConfig;

/// Application configuration module
/// This module handles loading, validating and saving the JSON configuration.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Project settings passed to the translator as context
    #[serde(default)]
    pub project: ProjectSettings,

    /// Scene and batch sizing
    #[serde(default)]
    pub batching: BatcherConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Limits checked on translated lines
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Provider name, as registered
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,

    // @field: Whether the provider can stream responses
    #[serde(default = "default_true")]
    pub supports_streaming: bool,
}

impl ProviderConfig {
    // @param provider_type: Registered provider name
    // @returns: Provider config with defaults
    pub fn new(provider_type: &str) -> Self {
        match provider_type {
            "ollama" => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                endpoint: default_ollama_endpoint(),
                api_key: String::new(),
                timeout_secs: default_timeout_secs(),
                rate_limit: None,
                supports_streaming: true,
            },
            other => Self {
                provider_type: other.to_string(),
                model: other.to_string(),
                endpoint: String::new(),
                api_key: String::new(),
                timeout_secs: default_timeout_secs(),
                rate_limit: None,
                supports_streaming: true,
            },
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(&default_provider())
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Name of the provider to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Available translation providers
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            available_providers: default_available_providers(),
            common: TranslationCommonConfig::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    pub fn get_provider_config(&self, provider_type: &str) -> Option<&ProviderConfig> {
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_type)
    }

    /// Get a provider entry, adding one with defaults if it is missing
    pub fn provider_config_mut(&mut self, provider_type: &str) -> &mut ProviderConfig {
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_type)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider_type));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationCommonConfig {
    /// System instructions sent with every batch
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Added to the instructions when a batch is requested again
    #[serde(default = "default_retry_instructions")]
    pub retry_instructions: String,

    /// Temperature parameter for text generation
    #[serde(default)]
    pub temperature: f32,

    /// Retry count for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry (in milliseconds), doubled on each retry
    #[serde(default = "default_backoff_time_ms")]
    pub backoff_time_ms: u64,

    /// Number of earlier summaries included as history
    #[serde(default = "default_max_history_lines")]
    pub max_history_lines: usize,

    /// Stream responses and report lines as they arrive
    #[serde(default)]
    pub stream_responses: bool,

    /// Halt the run when a batch fails
    #[serde(default)]
    pub stop_on_error: bool,

    /// Skip batches that are already translated
    #[serde(default)]
    pub resume: bool,

    /// Request a batch again if its translation fails validation
    #[serde(default)]
    pub retry_on_error: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            instructions: default_instructions(),
            retry_instructions: default_retry_instructions(),
            temperature: 0.0,
            max_retries: default_max_retries(),
            backoff_time_ms: default_backoff_time_ms(),
            max_history_lines: default_max_history_lines(),
            stream_responses: false,
            stop_on_error: false,
            resume: false,
            retry_on_error: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_available_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig::new("ollama")]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_time_ms() -> u64 {
    5000
}

fn default_max_history_lines() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn default_retry_instructions() -> String {
    DEFAULT_RETRY_INSTRUCTIONS.to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load a configuration file, writing a default one first if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.batching
            .validate()
            .map_err(|e| anyhow!("Invalid batching settings: {}", e))?;

        let provider = self
            .translation
            .get_active_provider_config()
            .ok_or_else(|| anyhow!("No settings for provider '{}'", self.translation.provider))?;

        if provider.rate_limit == Some(0) {
            return Err(anyhow!(
                "Rate limit for provider '{}' must be at least 1 request per minute",
                provider.provider_type
            ));
        }

        if !(0.0..=2.0).contains(&self.translation.common.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.translation.common.temperature
            ));
        }

        Ok(())
    }
}
