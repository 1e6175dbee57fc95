/*!
 * Walks a document scene by scene and batch by batch, translating each
 * batch through a `TranslationClient`.
 *
 * The document lock is only taken to read a batch and to attach its
 * translation; requests, retries and backoff sleeps all run unlocked.
 * Events are raised with snapshots after the lock has been released.
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::client::TranslationClient;
use super::context::BatchContext;
use super::events::{NoEvents, TranslationEvents};
use super::parser::{ParsedTranslation, TranslationParser};
use super::prompt::{DEFAULT_INSTRUCTIONS, DEFAULT_RETRY_INSTRUCTIONS, TranslationPrompt};
use super::request::{AbortHandle, StreamingCallback};
use super::response::Translation;
use crate::app_config::TranslationCommonConfig;
use crate::document::{SubtitleBatch, SubtitleDocument, SubtitleLine};
use crate::errors::{BatchError, TranslationError, ValidationError};
use crate::validation::SubtitleValidator;

/// Where the translator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Idle,
    TranslatingBatch,
    Retrying,
    Aborted,
    Terminal,
}

/// Behaviour of a translation run
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorOptions {
    pub instructions: String,
    pub retry_instructions: String,
    pub temperature: f32,

    /// Retries after a transient failure, per batch
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each one after
    pub backoff_time: Duration,

    /// History entries included in each batch context (0 for all)
    pub max_history_lines: usize,

    pub stream_responses: bool,

    /// Halt the run on the first batch that fails
    pub stop_on_error: bool,

    /// Skip batches that are already fully translated
    pub resume: bool,

    /// Request a batch once more with the retry instructions if it fails validation
    pub retry_on_error: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            retry_instructions: DEFAULT_RETRY_INSTRUCTIONS.to_string(),
            temperature: 0.0,
            max_retries: 3,
            backoff_time: Duration::from_secs(5),
            max_history_lines: 5,
            stream_responses: false,
            stop_on_error: false,
            resume: false,
            retry_on_error: false,
        }
    }
}

impl From<&TranslationCommonConfig> for TranslatorOptions {
    fn from(config: &TranslationCommonConfig) -> Self {
        Self {
            instructions: config.instructions.clone(),
            retry_instructions: config.retry_instructions.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            backoff_time: Duration::from_millis(config.backoff_time_ms),
            max_history_lines: config.max_history_lines,
            stream_responses: config.stream_responses,
            stop_on_error: config.stop_on_error,
            resume: config.resume,
            retry_on_error: config.retry_on_error,
        }
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationReport {
    pub batches_translated: usize,
    pub batches_skipped: usize,
    pub batches_failed: usize,
    pub lines_translated: usize,
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub elapsed: Duration,
}

impl TranslationReport {
    fn add_usage(&mut self, translation: &Translation) {
        self.prompt_tokens += translation.prompt_tokens.unwrap_or(0);
        self.output_tokens += translation.output_tokens.unwrap_or(0);
    }

    fn absorb(&mut self, other: TranslationReport) {
        self.batches_translated += other.batches_translated;
        self.batches_skipped += other.batches_skipped;
        self.batches_failed += other.batches_failed;
        self.lines_translated += other.lines_translated;
        self.prompt_tokens += other.prompt_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.output_tokens
    }

    pub fn summary(&self) -> String {
        format!(
            "Translated {} batches ({} lines), skipped {}, failed {}. Tokens: {} prompt, {} output. Elapsed: {:.1}s",
            self.batches_translated,
            self.lines_translated,
            self.batches_skipped,
            self.batches_failed,
            self.prompt_tokens,
            self.output_tokens,
            self.elapsed.as_secs_f64()
        )
    }
}

type ReportedLines = Arc<Mutex<HashSet<(usize, usize, usize)>>>;

/// Translates the scenes and batches of a document
pub struct SubtitleTranslator {
    client: Arc<dyn TranslationClient>,
    options: TranslatorOptions,
    events: Arc<dyn TranslationEvents>,
    validator: SubtitleValidator,
    parser: TranslationParser,
    abort: AbortHandle,
    state: Mutex<TranslatorState>,
    reported: ReportedLines,
}

impl SubtitleTranslator {
    pub fn new(client: Arc<dyn TranslationClient>, options: TranslatorOptions) -> Self {
        Self {
            client,
            options,
            events: Arc::new(NoEvents),
            validator: SubtitleValidator::default(),
            parser: TranslationParser::new(),
            abort: AbortHandle::new(),
            state: Mutex::new(TranslatorState::Idle),
            reported: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn TranslationEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn with_validator(mut self, validator: SubtitleValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Share an abort handle with the caller, e.g. a Ctrl-C handler
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    pub fn state(&self) -> TranslatorState {
        *self.state.lock()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Stop the run; the batch in flight is abandoned and no more are started
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    fn set_state(&self, state: TranslatorState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!("Translator state {:?} -> {:?}", *current, state);
            *current = state;
        }
    }

    /// Translate the given scenes, or every scene if `scenes` is `None`
    pub async fn translate_subtitles(
        &self,
        document: &SubtitleDocument,
        scenes: Option<&[usize]>,
    ) -> Result<TranslationReport, TranslationError> {
        let started = Instant::now();
        self.begin_session();

        let scene_numbers: Vec<usize> = document.read(|state| {
            state
                .scenes()
                .iter()
                .map(|scene| scene.number)
                .filter(|number| scenes.is_none_or(|wanted| wanted.contains(number)))
                .collect()
        });

        if scene_numbers.is_empty() {
            self.set_state(TranslatorState::Terminal);
            return Err(TranslationError::fatal("No scenes to translate"));
        }

        info!(
            "Translating {} scene(s) with {} ({})",
            scene_numbers.len(),
            self.client.name(),
            self.client.settings().model
        );

        let mut report = TranslationReport::default();
        for scene_number in scene_numbers {
            let result = self.run_scene(document, scene_number, None, &mut report).await;
            if let Err(error) = result {
                report.elapsed = started.elapsed();
                return Err(self.finish_with_error(error));
            }
        }

        report.elapsed = started.elapsed();
        self.set_state(TranslatorState::Terminal);
        self.events.info(&report.summary());
        Ok(report)
    }

    /// Translate one scene, limited to `batches` if given
    pub async fn translate_scene(
        &self,
        document: &SubtitleDocument,
        scene_number: usize,
        batches: Option<&[usize]>,
    ) -> Result<TranslationReport, TranslationError> {
        let started = Instant::now();
        self.begin_session();
        let mut report = TranslationReport::default();
        match self.run_scene(document, scene_number, batches, &mut report).await {
            Ok(()) => {
                report.elapsed = started.elapsed();
                self.set_state(TranslatorState::Terminal);
                Ok(report)
            }
            Err(error) => Err(self.finish_with_error(error)),
        }
    }

    /// Each run reports every streamed line afresh
    fn begin_session(&self) {
        self.reported.lock().clear();
        self.set_state(TranslatorState::Idle);
    }

    fn finish_with_error(&self, error: TranslationError) -> TranslationError {
        if error.is_aborted() {
            self.set_state(TranslatorState::Aborted);
            self.events.info("Translation aborted");
        } else {
            self.set_state(TranslatorState::Terminal);
            self.events.error(&format!("Translation halted: {}", error));
        }
        error
    }

    async fn run_scene(
        &self,
        document: &SubtitleDocument,
        scene_number: usize,
        batches: Option<&[usize]>,
        report: &mut TranslationReport,
    ) -> Result<(), TranslationError> {
        let batch_numbers: Vec<usize> = document.read(|state| {
            state.scene(scene_number).map(|scene| {
                scene
                    .batches
                    .iter()
                    .map(|batch| batch.number)
                    .filter(|number| batches.is_none_or(|wanted| wanted.contains(number)))
                    .collect()
            })
        })?;

        let mut scene_report = TranslationReport::default();
        for batch_number in batch_numbers {
            if self.abort.is_aborted() {
                report.absorb(scene_report);
                return Err(TranslationError::Aborted);
            }

            match self.translate_batch(document, scene_number, batch_number, &mut scene_report).await {
                Ok(()) => {}
                Err(TranslationError::Aborted) => {
                    report.absorb(scene_report);
                    return Err(TranslationError::Aborted);
                }
                Err(error) => {
                    let message = format!("Failed to translate batch {} of scene {}: {}", batch_number, scene_number, error);
                    warn!("{}", message);
                    let failed = document.write(|state| {
                        state.batch_mut(scene_number, batch_number).ok().map(|batch| {
                            batch.errors.push(BatchError::Translation(error.to_string()));
                            batch.clone()
                        })
                    });
                    self.events.error(&message);
                    if let Some(batch) = failed {
                        self.events.batch_failed(&batch, &error.to_string());
                    }
                    scene_report.batches_failed += 1;

                    if self.options.stop_on_error {
                        report.absorb(scene_report);
                        return Err(error);
                    }
                }
            }
        }

        report.absorb(scene_report);

        let scene = document.read(|state| state.scene(scene_number).cloned())?;
        self.events.scene_translated(&scene);
        Ok(())
    }

    async fn translate_batch(
        &self,
        document: &SubtitleDocument,
        scene_number: usize,
        batch_number: usize,
        report: &mut TranslationReport,
    ) -> Result<(), TranslationError> {
        let (originals, context, complete) = document.read(|state| {
            let batch = state.batch(scene_number, batch_number)?;
            let context = BatchContext::for_batch(state, scene_number, batch_number, self.options.max_history_lines)?;
            Ok::<_, TranslationError>((batch.originals.clone(), context, batch.all_translated()))
        })?;

        if self.options.resume && complete {
            debug!("Batch ({},{}) already translated, skipping", scene_number, batch_number);
            report.batches_skipped += 1;
            return Ok(());
        }

        if originals.is_empty() {
            self.events.warning(&format!("Batch {} of scene {} has no lines", batch_number, scene_number));
            report.batches_skipped += 1;
            return Ok(());
        }

        document.write(|state| {
            state
                .batch_mut(scene_number, batch_number)
                .map(|batch| batch.update_context(&context.to_metadata()))
        })?;

        let mut instructions = self.options.instructions.clone();
        let passes = if self.options.retry_on_error { 2 } else { 1 };

        for pass in 0..passes {
            let prompt = self.client.build_prompt(&instructions, &originals, &context)?;
            let translation = self.request_with_retry(prompt, scene_number, batch_number, &originals).await?;
            report.add_usage(&translation);

            if translation.truncated {
                self.events.warning(&format!(
                    "Response for batch {} of scene {} was cut short and may be incomplete",
                    batch_number, scene_number
                ));
            }

            let parsed = self.parser.parse(&translation.text)?;
            let (batch, errors) = self.attach_translation(document, scene_number, batch_number, &originals, &parsed)?;

            let needs_retry = !errors.is_empty() && pass + 1 < passes;
            if needs_retry {
                info!(
                    "Batch {} of scene {} failed validation, retrying with retry instructions",
                    batch_number, scene_number
                );
                instructions = format!("{}\n\n{}", self.options.instructions, self.options.retry_instructions);
                continue;
            }

            for error in &errors {
                self.events.warning(&format!("Batch {} of scene {}: {}", batch_number, scene_number, error));
            }

            report.batches_translated += 1;
            report.lines_translated += batch.translated.len();
            self.events.batch_translated(&batch);
            break;
        }

        Ok(())
    }

    /// Store parsed lines and summaries on the document and validate the batch.
    /// Returns a snapshot of the batch and its validation errors.
    fn attach_translation(
        &self,
        document: &SubtitleDocument,
        scene_number: usize,
        batch_number: usize,
        originals: &[SubtitleLine],
        parsed: &ParsedTranslation,
    ) -> Result<(SubtitleBatch, Vec<ValidationError>), TranslationError> {
        let (matched, unmatched) = parsed.match_originals(originals);

        let result = document.write(|state| {
            let batch = state.batch_mut(scene_number, batch_number)?;
            // A fresh response supersedes earlier request failures
            batch.errors.retain(|error| error.as_validation().is_some());
            for line in matched {
                batch.set_translated_line(line);
            }
            if parsed.summary.is_some() {
                batch.set_summary(parsed.summary.clone());
            }

            let mut errors = self.validator.validate_batch(batch);
            if !unmatched.is_empty() {
                let error = ValidationError::UnmatchedLines { lines: unmatched };
                batch.errors.push(BatchError::Validation(error.clone()));
                errors.push(error);
            }
            let snapshot = batch.clone();

            if parsed.scene.is_some() {
                state.scene_mut(scene_number)?.set_summary(parsed.scene.clone());
            }
            state.refresh();

            Ok::<_, TranslationError>((snapshot, errors))
        })?;

        Ok(result)
    }

    /// Send a prompt, retrying transient failures with exponential backoff
    async fn request_with_retry(
        &self,
        prompt: TranslationPrompt,
        scene_number: usize,
        batch_number: usize,
        originals: &[SubtitleLine],
    ) -> Result<Translation, TranslationError> {
        let mut attempt: u32 = 0;

        loop {
            if self.abort.is_aborted() {
                return Err(TranslationError::Aborted);
            }

            self.set_state(if attempt == 0 {
                TranslatorState::TranslatingBatch
            } else {
                TranslatorState::Retrying
            });

            let callback = self.streaming_callback(scene_number, batch_number, originals);
            let result = self
                .client
                .request_translation(prompt.clone(), self.options.temperature, &self.abort, callback)
                .await;

            match result {
                Ok(Some(translation)) => return Ok(translation),
                Ok(None) if self.abort.is_aborted() => return Err(TranslationError::Aborted),
                Ok(None) => return Err(TranslationError::fatal("The provider returned no response")),
                Err(TranslationError::Transient(message)) if attempt < self.options.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    attempt += 1;
                    self.events.warning(&format!(
                        "Batch {} of scene {} failed ({}), retry {} of {} in {:?}",
                        batch_number, scene_number, message, attempt, self.options.max_retries, delay
                    ));
                    self.set_state(TranslatorState::Retrying);

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.abort.aborted() => return Err(TranslationError::Aborted),
                    }
                }
                Err(TranslationError::Transient(message)) => {
                    return Err(TranslationError::fatal(format!(
                        "Giving up after {} retries: {}",
                        self.options.max_retries, message
                    )));
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// `backoff_time * 2^attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.options.backoff_time.saturating_mul(1u32 << attempt.min(16))
    }

    /// Callback raising `batch_updated` with lines not reported before
    fn streaming_callback(
        &self,
        scene_number: usize,
        batch_number: usize,
        originals: &[SubtitleLine],
    ) -> Option<StreamingCallback> {
        if !self.options.stream_responses || !self.client.supports_streaming() {
            return None;
        }

        let events = Arc::clone(&self.events);
        let reported = Arc::clone(&self.reported);
        let parser = self.parser;
        let originals = originals.to_vec();

        Some(Box::new(move |partial: Translation| {
            let parsed = parser.parse_partial(&partial.text);
            let (matched, _) = parsed.match_originals(&originals);

            let fresh: Vec<SubtitleLine> = {
                let mut reported = reported.lock();
                matched
                    .into_iter()
                    .filter(|line| reported.insert((scene_number, batch_number, line.number)))
                    .collect()
            };
            if fresh.is_empty() {
                return;
            }

            let mut batch = SubtitleBatch::new(scene_number, batch_number, originals.clone());
            for line in fresh {
                batch.set_translated_line(line);
            }
            events.batch_updated(&batch);
        }))
    }
}
