/*!
 * The contract between the translator and a translation provider.
 *
 * A client turns a prompt into a `Translation`. Implementations only have
 * to provide `send_request`; `request_translation` wraps it with abort
 * handling and rate limiting.
 */

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;

use super::context::BatchContext;
use super::prompt::{DEFAULT_USER_PROMPT, TranslationPrompt};
use super::request::{AbortHandle, StreamingCallback, TranslationRequest};
use super::response::Translation;
use crate::app_config::ProviderConfig;
use crate::document::SubtitleLine;
use crate::errors::TranslationError;

#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Provider name, as registered
    fn name(&self) -> &str;

    fn settings(&self) -> &ProviderConfig;

    fn supports_streaming(&self) -> bool {
        self.settings().supports_streaming
    }

    fn build_prompt(
        &self,
        instructions: &str,
        lines: &[SubtitleLine],
        context: &BatchContext,
    ) -> Result<TranslationPrompt, TranslationError> {
        TranslationPrompt::build(DEFAULT_USER_PROMPT, instructions, lines, context)
    }

    /// Send one request. Returns `Ok(None)` if the request was aborted.
    ///
    /// Streaming clients feed each text delta to
    /// `TranslationRequest::process_streaming_delta` and check
    /// `TranslationRequest::is_aborted` between deltas.
    async fn send_request(
        &self,
        request: &mut TranslationRequest,
        temperature: f32,
    ) -> Result<Option<Translation>, TranslationError>;

    /// Send a prompt, honouring the abort handle and the configured rate limit.
    /// Returns `Ok(None)` when the run was aborted.
    async fn request_translation(
        &self,
        prompt: TranslationPrompt,
        temperature: f32,
        abort: &AbortHandle,
        callback: Option<StreamingCallback>,
    ) -> Result<Option<Translation>, TranslationError> {
        if abort.is_aborted() {
            return Ok(None);
        }

        let started = Instant::now();
        let mut request = TranslationRequest::new(prompt, abort.clone());
        if let Some(callback) = callback {
            if self.supports_streaming() {
                request = request.with_streaming_callback(callback);
            }
        }

        let result = self.send_request(&mut request, temperature).await;

        if let Some(minimum) = minimum_request_duration(self.settings().rate_limit) {
            let elapsed = started.elapsed();
            if elapsed < minimum {
                let wait = minimum - elapsed;
                debug!("Rate limit: waiting {:?} before the next request", wait);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = abort.aborted() => {}
                }
            }
        }

        if abort.is_aborted() {
            return Ok(None);
        }
        result
    }
}

/// Shortest time a request may take at `rate_limit` requests per minute
pub fn minimum_request_duration(rate_limit: Option<u32>) -> Option<Duration> {
    rate_limit
        .filter(|rate| *rate > 0)
        .map(|rate| Duration::from_secs_f64(60.0 / f64::from(rate)))
}
