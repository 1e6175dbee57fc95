/*!
 * Notifications raised while translating.
 *
 * The translator calls a `TranslationEvents` sink directly, one method per
 * event kind. Sinks receive snapshots taken after the document lock has been
 * released, so a listener may freely read or edit the document.
 */

use std::sync::Arc;

use log::{error, info, warn};

use crate::document::{SubtitleBatch, SubtitleScene};

/// Receiver for translation progress. Every method defaults to doing nothing.
pub trait TranslationEvents: Send + Sync {
    /// A batch was translated and validated
    fn batch_translated(&self, _batch: &SubtitleBatch) {}

    /// Streamed lines arrived for a batch still in progress
    fn batch_updated(&self, _batch: &SubtitleBatch) {}

    /// A batch could not be translated; `error` is also on `batch.errors`
    fn batch_failed(&self, _batch: &SubtitleBatch, _error: &str) {}

    /// Every requested batch in a scene has been processed
    fn scene_translated(&self, _scene: &SubtitleScene) {}

    fn error(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}

    fn info(&self, _message: &str) {}
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl TranslationEvents for NoEvents {}

/// Sink that writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEvents;

impl TranslationEvents for LoggingEvents {
    fn batch_translated(&self, batch: &SubtitleBatch) {
        info!(
            "Translated batch {} of scene {} ({} of {} lines)",
            batch.number,
            batch.scene,
            batch.translated.len(),
            batch.size()
        );
    }

    fn batch_updated(&self, batch: &SubtitleBatch) {
        log::debug!(
            "Received {} streamed lines for batch ({},{})",
            batch.translated.len(),
            batch.scene,
            batch.number
        );
    }

    fn scene_translated(&self, scene: &SubtitleScene) {
        match scene.summary() {
            Some(summary) => info!("Translated scene {}: {}", scene.number, summary),
            None => info!("Translated scene {}", scene.number),
        }
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }
}

/// Forwards every event to each registered sink in order
#[derive(Clone, Default)]
pub struct FanOutEvents {
    sinks: Vec<Arc<dyn TranslationEvents>>,
}

impl FanOutEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TranslationEvents>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add(&mut self, sink: Arc<dyn TranslationEvents>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TranslationEvents for FanOutEvents {
    fn batch_translated(&self, batch: &SubtitleBatch) {
        self.sinks.iter().for_each(|sink| sink.batch_translated(batch));
    }

    fn batch_updated(&self, batch: &SubtitleBatch) {
        self.sinks.iter().for_each(|sink| sink.batch_updated(batch));
    }

    fn batch_failed(&self, batch: &SubtitleBatch, error: &str) {
        self.sinks.iter().for_each(|sink| sink.batch_failed(batch, error));
    }

    fn scene_translated(&self, scene: &SubtitleScene) {
        self.sinks.iter().for_each(|sink| sink.scene_translated(scene));
    }

    fn error(&self, message: &str) {
        self.sinks.iter().for_each(|sink| sink.error(message));
    }

    fn warning(&self, message: &str) {
        self.sinks.iter().for_each(|sink| sink.warning(message));
    }

    fn info(&self, message: &str) {
        self.sinks.iter().for_each(|sink| sink.info(message));
    }
}
