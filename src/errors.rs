/*!
 * Error types for the subtrans library.
 *
 * Structural errors come from edits that would break the document's
 * ordering invariants. Validation errors are non-fatal records attached to
 * batches. Translation errors are classified as transient (retried), fatal
 * (recorded against the batch) or aborted (cooperative cancellation).
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the document model, the batcher and the editor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// Requested scene does not exist
    #[error("Scene {0} does not exist")]
    SceneNotFound(usize),

    /// Requested batch does not exist
    #[error("Batch ({scene},{batch}) does not exist")]
    BatchNotFound {
        /// Scene number
        scene: usize,
        /// Batch number within the scene
        batch: usize,
    },

    /// Requested line does not exist
    #[error("Line {0} does not exist")]
    LineNotFound(usize),

    /// An edit would violate a structural invariant
    #[error("{0}")]
    Structure(String),

    /// Invalid batching configuration
    #[error("Invalid batcher configuration: {0}")]
    Config(String),

    /// Subtitle text could not be parsed
    #[error("Failed to parse subtitles: {0}")]
    Parse(String),

    /// Subtitle text could not be composed
    #[error("Failed to compose subtitles: {0}")]
    Compose(String),
}

impl SubtitleError {
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }
}

/// Problems found in a batch's translation. Never raised, only collected.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Some original lines have no translation
    #[error("Untranslated lines: {}", format_lines(.lines))]
    UntranslatedLines { lines: Vec<usize> },

    /// Translated lines with no text
    #[error("Empty translations: {}", format_lines(.lines))]
    EmptyLines { lines: Vec<usize> },

    /// Translated lines that could not be matched to an original
    #[error("{} translated line(s) could not be matched to an original line", .lines.len())]
    UnmatchedLines { lines: Vec<usize> },

    /// Translated lines longer than the configured limit
    #[error("Lines too long (max {max_characters} characters): {}", format_lines(.lines))]
    LineTooLong {
        lines: Vec<usize>,
        max_characters: usize,
    },

    /// Translated lines with more line breaks than allowed
    #[error("Too many newlines (max {max_newlines}): {}", format_lines(.lines))]
    TooManyNewlines {
        lines: Vec<usize>,
        max_newlines: usize,
    },
}

impl ValidationError {
    /// Short identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UntranslatedLines { .. } => "untranslated_lines",
            Self::EmptyLines { .. } => "empty_lines",
            Self::UnmatchedLines { .. } => "unmatched_lines",
            Self::LineTooLong { .. } => "line_too_long",
            Self::TooManyNewlines { .. } => "too_many_newlines",
        }
    }

    /// Line numbers the error refers to
    pub fn lines(&self) -> &[usize] {
        match self {
            Self::UntranslatedLines { lines }
            | Self::EmptyLines { lines }
            | Self::UnmatchedLines { lines }
            | Self::LineTooLong { lines, .. }
            | Self::TooManyNewlines { lines, .. } => lines,
        }
    }
}

fn format_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur when talking to a provider's API
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The request could not be sent or completed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be understood
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Network-class failures that are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if let Some(status) = error.status() {
            Self::ApiError {
                status_code: status.as_u16(),
                message: error.to_string(),
            }
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Network or timeout class failure, retried with backoff
    #[error("Transient translation failure: {0}")]
    Transient(String),

    /// Malformed response, missing context or refusal. Not retried.
    #[error("Translation failed: {0}")]
    Fatal(String),

    /// The run was cancelled
    #[error("Translation aborted")]
    Aborted,

    /// The document could not be updated with the translation
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),
}

impl TranslationError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Subtitle(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        if error.is_retryable() {
            Self::Transient(error.to_string())
        } else {
            Self::Fatal(error.to_string())
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::from(error).into()
    }
}

/// Error record stored on a batch
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchError {
    /// A validation problem with the translation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The batch could not be translated
    #[error("{0}")]
    Translation(String),
}

impl BatchError {
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            Self::Translation(_) => None,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::File(format!("Invalid JSON: {}", error))
    }
}
