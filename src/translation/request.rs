/*!
 * Per-request state: the prompt, the streaming accumulator and the abort flag.
 *
 * A streamed response arrives as small text deltas. The accumulator only
 * hands text to its callback once a blank line closes a section, so a
 * listener never sees half a line block, and never sees the same section
 * twice.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use tokio::sync::Notify;

use super::prompt::TranslationPrompt;
use super::response::Translation;

/// Receives each completed section of a streamed response
pub type StreamingCallback = Box<dyn FnMut(Translation) + Send>;

const SECTION_SEPARATOR: &str = "\n\n";

/// Collects streamed deltas and reports separator-terminated sections
#[derive(Default)]
pub struct StreamingAccumulator {
    accumulated_text: String,
    last_processed_pos: usize,
    callback: Option<StreamingCallback>,
}

impl StreamingAccumulator {
    pub fn new(callback: Option<StreamingCallback>) -> Self {
        Self {
            accumulated_text: String::new(),
            last_processed_pos: 0,
            callback,
        }
    }

    /// Append a delta and report everything up to the last complete section
    pub fn process_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }

        self.accumulated_text.push_str(delta);

        if !self.pending_text().contains(SECTION_SEPARATOR) {
            return;
        }

        let Some(position) = self.accumulated_text.rfind(SECTION_SEPARATOR) else {
            return;
        };
        let end = position + SECTION_SEPARATOR.len();
        if end <= self.last_processed_pos {
            return;
        }
        self.last_processed_pos = end;

        let section = &self.accumulated_text[..end];
        if section.trim().is_empty() {
            return;
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(Translation::partial(section));
        }
    }

    /// Everything received so far
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// Text received after the last reported section
    pub fn pending_text(&self) -> &str {
        &self.accumulated_text[self.last_processed_pos..]
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Take the full text, including anything not yet reported
    pub fn finish(self) -> String {
        self.accumulated_text
    }
}

/// Shared cancellation flag for a translation run
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortState>,
}

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    notify: Notify,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stops as soon as possible
    pub fn abort(&self) {
        if !self.inner.aborted.swap(true, Ordering::SeqCst) {
            debug!("Abort requested");
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Clear the flag so the handle can be reused for another run
    pub fn reset(&self) {
        self.inner.aborted.store(false, Ordering::SeqCst);
    }

    /// Resolves once an abort has been requested
    pub async fn aborted(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// One prompt on its way to a provider
pub struct TranslationRequest {
    /// The prompt to send
    pub prompt: TranslationPrompt,
    accumulator: StreamingAccumulator,
    abort: AbortHandle,
}

impl TranslationRequest {
    pub fn new(prompt: TranslationPrompt, abort: AbortHandle) -> Self {
        Self {
            prompt,
            accumulator: StreamingAccumulator::default(),
            abort,
        }
    }

    pub fn with_streaming_callback(mut self, callback: StreamingCallback) -> Self {
        self.accumulator = StreamingAccumulator::new(Some(callback));
        self
    }

    /// Whether the caller wants streamed sections
    pub fn is_streaming(&self) -> bool {
        self.accumulator.has_callback()
    }

    pub fn process_streaming_delta(&mut self, delta: &str) {
        self.accumulator.process_delta(delta);
    }

    pub fn accumulated_text(&self) -> &str {
        self.accumulator.accumulated_text()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    /// Full streamed text, including any unterminated tail
    pub fn take_streamed_text(&mut self) -> String {
        std::mem::take(&mut self.accumulator).finish()
    }
}
