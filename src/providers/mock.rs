/*!
 * In-process translation client for tests and dry runs.
 *
 * The mock answers in the same line-block format a real model is asked
 * for, so responses go through the normal parser:
 * - `MockBehavior::Echo` - translates every line by tagging it
 * - `MockBehavior::Scripted` - replays fixed responses in order
 * - `MockBehavior::FailThenSucceed` - transient failures before a good answer
 * - `MockBehavior::Fatal` - always fails without retry
 * - `MockBehavior::Slow` - waits before answering, stopping early on abort
 * - `MockBehavior::Truncated` - streams half an answer then breaks
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::app_config::ProviderConfig;
use crate::errors::TranslationError;
use crate::translation::{Translation, TranslationClient, TranslationPrompt, TranslationRequest};

/// Behavior mode for the mock client
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a tagged copy of each line
    Echo,
    /// Returns these responses in turn, repeating the last one
    Scripted(Vec<String>),
    /// Fails with a transient error for the first `failures` requests
    FailThenSucceed { failures: usize },
    /// Always fails with a fatal error
    Fatal,
    /// Answers after `delay_ms`, unless aborted first
    Slow { delay_ms: u64 },
    /// Streams the first half of an answer, then the connection drops
    Truncated,
}

/// Mock client for exercising the translator
#[derive(Debug, Clone)]
pub struct MockClient {
    /// Behavior mode
    behavior: MockBehavior,
    /// Provider settings
    settings: ProviderConfig,
    /// Streamed deltas are cut into pieces of this many characters
    chunk_size: usize,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every prompt received
    prompts: Arc<Mutex<Vec<TranslationPrompt>>>,
}

impl MockClient {
    pub fn new(behavior: MockBehavior) -> Self {
        Self::with_settings(behavior, ProviderConfig::new("mock"))
    }

    pub fn with_settings(behavior: MockBehavior, settings: ProviderConfig) -> Self {
        Self {
            behavior,
            settings,
            chunk_size: 16,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Size of each streamed delta
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<TranslationPrompt> {
        self.prompts.lock().clone()
    }

    /// Well-formed response translating each prompt line
    pub fn echo_response(prompt: &TranslationPrompt) -> String {
        let mut response = String::new();
        for line in &prompt.lines {
            response.push_str(&format!(
                "#{}\nOriginal>\n{}\nTranslation>\n[translated] {}\n\n",
                line.number, line.text, line.text
            ));
        }
        let first = prompt.lines.first().map_or(0, |line| line.number);
        let last = prompt.lines.last().map_or(0, |line| line.number);
        response.push_str(&format!("<summary>Lines {} to {}</summary>\n", first, last));
        response.push_str(&format!("<scene>Scene {} so far</scene>\n", prompt.context.scene_number));
        response
    }

    fn scripted_response(responses: &[String], count: usize) -> String {
        responses
            .get(count)
            .or_else(|| responses.last())
            .cloned()
            .unwrap_or_default()
    }

    /// Deliver `text` through the request, streamed if the caller asked for it
    async fn deliver(&self, request: &mut TranslationRequest, text: String) -> Option<Translation> {
        if !request.is_streaming() {
            let usage = (Some(token_estimate(&request.prompt.content)), Some(token_estimate(&text)));
            return Some(Translation::new(text).with_usage(usage.0, usage.1));
        }

        for delta in chunks(&text, self.chunk_size) {
            if request.is_aborted() {
                return None;
            }
            request.process_streaming_delta(delta);
            tokio::task::yield_now().await;
        }
        Some(Translation::new(request.take_streamed_text()))
    }
}

/// Rough token count, four characters to a token
fn token_estimate(text: &str) -> u64 {
    text.chars().count() as u64 / 4
}

/// Split on character boundaries into pieces of at most `size` characters
fn chunks(text: &str, size: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (index, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[async_trait]
impl TranslationClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn settings(&self) -> &ProviderConfig {
        &self.settings
    }

    async fn send_request(
        &self,
        request: &mut TranslationRequest,
        _temperature: f32,
    ) -> Result<Option<Translation>, TranslationError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        match &self.behavior {
            MockBehavior::Echo => {
                let text = Self::echo_response(&request.prompt);
                Ok(self.deliver(request, text).await)
            }

            MockBehavior::Scripted(responses) => {
                let text = Self::scripted_response(responses, count);
                Ok(self.deliver(request, text).await)
            }

            MockBehavior::FailThenSucceed { failures } => {
                if count < *failures {
                    return Err(TranslationError::transient(format!("Simulated timeout on request {}", count + 1)));
                }
                let text = Self::echo_response(&request.prompt);
                Ok(self.deliver(request, text).await)
            }

            MockBehavior::Fatal => Err(TranslationError::fatal("Simulated refusal")),

            MockBehavior::Slow { delay_ms } => {
                let abort = request.abort_handle().clone();
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(*delay_ms)) => {}
                    _ = abort.aborted() => return Ok(None),
                }
                let text = Self::echo_response(&request.prompt);
                Ok(self.deliver(request, text).await)
            }

            MockBehavior::Truncated => {
                let text = Self::echo_response(&request.prompt);
                let half: String = text.chars().take(text.chars().count() / 2).collect();
                for delta in chunks(&half, self.chunk_size) {
                    request.process_streaming_delta(delta);
                }
                let mut translation = Translation::new(request.take_streamed_text());
                translation.truncated = true;
                Ok(Some(translation))
            }
        }
    }
}
