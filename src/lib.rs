/*!
 * # subtrans - scene-aware subtitle translation
 *
 * A Rust library for translating subtitles with a language model, one batch
 * of lines at a time, with the scene's running summary as context.
 *
 * ## Features
 *
 * - Group timed lines into scenes (by silence) and batches (by size)
 * - Structural editing of scenes, batches and lines with undo records
 * - Batch translation through pluggable providers:
 *   - Ollama (local LLM)
 *   - an in-process mock for dry runs and tests
 * - Streaming responses with partial line updates
 * - Retry with exponential backoff, cooperative cancellation
 * - Validation of translated lines against length limits
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `document`: scenes, batches and lines behind a reentrant lock
 * - `batcher`: partitioning of lines into scenes and batches
 * - `editor`: structural edit operations
 * - `translation`: the translation loop and its collaborators:
 *   - `translation::translator`: scene/batch orchestration
 *   - `translation::request`: streaming accumulation and abort handling
 *   - `translation::parser`: response parsing
 * - `validation`: checks on translated lines
 * - `providers`: provider registry and clients
 * - `formats`: subtitle file handlers
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod batcher;
pub mod document;
pub mod editor;
pub mod errors;
pub mod formats;
pub mod providers;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use batcher::{BatcherConfig, SubtitleBatcher};
pub use document::{LineUpdate, SubtitleBatch, SubtitleBuilder, SubtitleDocument, SubtitleLine, SubtitleScene};
pub use editor::SubtitleEditor;
pub use errors::{AppError, BatchError, ProviderError, SubtitleError, TranslationError, ValidationError};
pub use providers::ProviderRegistry;
pub use translation::{SubtitleTranslator, TranslationClient, TranslationEvents};
pub use validation::{SubtitleValidator, ValidationConfig};
