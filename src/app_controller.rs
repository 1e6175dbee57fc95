use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::batcher::SubtitleBatcher;
use crate::document::{SubtitleBatch, SubtitleDocument, SubtitleLine};
use crate::errors::ValidationError;
use crate::formats::{self, SrtFileHandler, SubtitleFileHandler};
use crate::providers::ProviderRegistry;
use crate::translation::{
    AbortHandle, FanOutEvents, LoggingEvents, SubtitleTranslator, TranslationEvents, TranslationReport,
    TranslatorOptions,
};
use crate::validation::SubtitleValidator;

// @module: Application controller for subtitle projects

/// Overrides for a single translation run
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Provider name, overriding the configured one
    pub provider: Option<String>,
    /// Model name, overriding the provider's configured model
    pub model: Option<String>,
    /// Scenes to translate; all when `None`
    pub scenes: Option<Vec<usize>>,
    /// Force streaming on
    pub stream: bool,
    /// Show a progress bar
    pub progress: bool,
}

/// Validation problems for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValidation {
    pub scene: usize,
    pub batch: usize,
    pub errors: Vec<ValidationError>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Provider factories
    registry: ProviderRegistry,
    // @field: Shared with the Ctrl-C handler
    abort: AbortHandle,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self {
            config,
            registry: ProviderRegistry::with_defaults(),
            abort: AbortHandle::new(),
        })
    }

    /// Replace the provider registry
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle used to cancel a running translation
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Load a subtitle file, batch it and write the project file
    pub fn batch_file(&self, input_file: &Path, project_file: Option<&Path>) -> Result<PathBuf> {
        let handler = formats::handler_for_path(input_file)?;
        let content = fs::read_to_string(input_file)
            .with_context(|| format!("Failed to read subtitle file: {}", input_file.display()))?;
        let loaded = handler
            .load(&content)
            .with_context(|| format!("Failed to load {}", input_file.display()))?;

        info!("Loaded {} lines from {}", loaded.lines.len(), input_file.display());

        let mut metadata = loaded.metadata;
        metadata.insert("format".to_string(), loaded.format.into());
        let document =
            SubtitleDocument::from_lines(loaded.lines, metadata).with_settings(self.config.project.clone());

        let batcher = SubtitleBatcher::new(self.config.batching.clone())?;
        document.editor().auto_batch(&batcher)?;

        let (scenes, batches) = document.read(|state| (state.scene_count(), state.batch_keys().len()));
        info!("Grouped into {} scenes and {} batches", scenes, batches);

        let output = project_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input_file.with_extension("subtrans.json"));
        document.save_project(&output)?;
        info!("Success: {}", output.display());
        Ok(output)
    }

    /// Translate a project file in place
    pub async fn translate_project(&self, project_file: &Path, options: TranslateOptions) -> Result<TranslationReport> {
        let document = SubtitleDocument::load_project(project_file)
            .with_context(|| format!("Failed to load project: {}", project_file.display()))?;

        let mut translation = self.config.translation.clone();
        if let Some(provider) = &options.provider {
            translation.provider = provider.clone();
        }
        let provider_name = translation.provider.clone();
        let settings = translation.provider_config_mut(&provider_name);
        if let Some(model) = &options.model {
            settings.model = model.clone();
        }
        let settings = settings.clone();

        let client = self.registry.create(&settings)?;

        let mut translator_options = TranslatorOptions::from(&translation.common);
        translator_options.stream_responses |= options.stream;

        // Count only the batches the translator will attempt
        let resume = translator_options.resume;
        let batch_count = document.read(|state| {
            state
                .scenes()
                .iter()
                .filter(|scene| options.scenes.as_ref().is_none_or(|wanted| wanted.contains(&scene.number)))
                .flat_map(|scene| scene.batches.iter())
                .filter(|batch| !batch.is_empty() && !(resume && batch.all_translated()))
                .count()
        });

        let mut events = FanOutEvents::new().with(Arc::new(LoggingEvents));
        let progress = options.progress.then(|| Arc::new(ProgressEvents::new(batch_count as u64)));
        if let Some(progress) = &progress {
            events.add(progress.clone());
        }

        let translator = SubtitleTranslator::new(client, translator_options)
            .with_events(Arc::new(events))
            .with_validator(SubtitleValidator::new(self.config.validation.clone()))
            .with_abort_handle(self.abort.clone());

        info!("🚀 subtrans: {} - {}", settings.provider_type, settings.model);
        let result = translator
            .translate_subtitles(&document, options.scenes.as_deref())
            .await;

        if let Some(progress) = &progress {
            progress.finish();
        }

        // Keep whatever was translated, even after an abort or failure
        document
            .save_project(project_file)
            .with_context(|| format!("Failed to save project: {}", project_file.display()))?;

        let report = result?;
        info!("🔢 {}", report.summary());
        Ok(report)
    }

    /// Re-run validation over every translated batch and save the results
    pub fn validate_project(&self, project_file: &Path) -> Result<Vec<BatchValidation>> {
        let document = SubtitleDocument::load_project(project_file)
            .with_context(|| format!("Failed to load project: {}", project_file.display()))?;
        let validator = SubtitleValidator::new(self.config.validation.clone());

        let results = document.write(|state| {
            let mut results = Vec::new();
            for (scene, batch) in state.batch_keys() {
                let Ok(target) = state.batch_mut(scene, batch) else {
                    continue;
                };
                let errors = validator.validate_batch(target);
                if !errors.is_empty() {
                    results.push(BatchValidation { scene, batch, errors });
                }
            }
            results
        });

        document.save_project(project_file)?;

        for result in &results {
            for error in &result.errors {
                warn!("Scene {} batch {}: {}", result.scene, result.batch, error);
            }
        }
        info!("{} batch(es) with validation errors", results.len());
        Ok(results)
    }

    /// Write the project out as SRT, using translations unless `original` is set
    pub fn compose(&self, project_file: &Path, output_file: Option<&Path>, original: bool) -> Result<PathBuf> {
        let document = SubtitleDocument::load_project(project_file)
            .with_context(|| format!("Failed to load project: {}", project_file.display()))?;

        let (lines, metadata) = document.read(|state| {
            (
                composable_lines(state.originals(), state.translated()),
                state.metadata.clone(),
            )
        });
        if lines.is_empty() {
            return Err(anyhow!("Project has no lines: {}", project_file.display()));
        }

        let missing = lines.iter().filter(|line| line.translation.is_none()).count();
        if !original && missing > 0 {
            warn!("{} line(s) have no translation, writing the original text", missing);
        }

        let content = SrtFileHandler::new()
            .with_translations(!original)
            .compose(&lines, &metadata)?;

        let output = output_file.map(Path::to_path_buf).unwrap_or_else(|| {
            let suffix = if original {
                "original".to_string()
            } else {
                self.config
                    .project
                    .target_language
                    .clone()
                    .unwrap_or_else(|| "translated".to_string())
            };
            project_file.with_extension(format!("{}.srt", suffix))
        });

        fs::write(&output, content).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Success: {}", output.display());
        Ok(output)
    }
}

/// Originals with their translation text filled in
fn composable_lines(originals: &[SubtitleLine], translated: &[SubtitleLine]) -> Vec<SubtitleLine> {
    originals
        .iter()
        .map(|line| {
            let mut line = line.clone();
            if let Some(translation) = translated.iter().find(|t| t.number == line.number) {
                line.translation = Some(translation.text.clone());
            }
            line
        })
        .collect()
}

/// Progress bar driven by translation events
pub struct ProgressEvents {
    bar: ProgressBar,
}

impl ProgressEvents {
    pub fn new(total_batches: u64) -> Self {
        let bar = ProgressBar::new(total_batches);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message("Translating");
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TranslationEvents for ProgressEvents {
    fn batch_translated(&self, batch: &SubtitleBatch) {
        self.bar.inc(1);
        self.bar.set_message(format!("scene {} batch {}", batch.scene, batch.number));
    }

    fn batch_failed(&self, batch: &SubtitleBatch, _error: &str) {
        self.bar.inc(1);
        self.bar.set_message(format!("scene {} batch {} failed", batch.scene, batch.number));
    }

    fn batch_updated(&self, batch: &SubtitleBatch) {
        self.bar.set_message(format!(
            "scene {} batch {}: {}/{} lines",
            batch.scene,
            batch.number,
            batch.translated.len(),
            batch.size()
        ));
    }
}
