/*!
 * The record a translation client returns for one request.
 */

use serde::{Deserialize, Serialize};

/// Text returned by a provider, with whatever usage information it reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Raw response text
    pub text: String,

    /// Batch synopsis from the `<summary>` tag, once parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Scene synopsis from the `<scene>` tag, once parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,

    /// Why the provider stopped generating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,

    /// The stream failed before the provider finished, so the text may be incomplete
    #[serde(default)]
    pub truncated: bool,

    /// A streamed section delivered before the response completed
    #[serde(default)]
    pub partial: bool,
}

impl Translation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A streamed section of a response still in progress
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            partial: true,
            ..Default::default()
        }
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn with_usage(mut self, prompt_tokens: Option<u64>, output_tokens: Option<u64>) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether the provider stopped because it ran out of tokens
    pub fn reached_token_limit(&self) -> bool {
        matches!(self.finish_reason.as_deref(), Some("length"))
    }
}
