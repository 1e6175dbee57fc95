/*!
 * Batch translation through an external provider.
 *
 * - `client`: the provider contract and rate limiting
 * - `context`: per-batch context and summary history
 * - `events`: typed progress notifications
 * - `parser`: extraction of translated lines from a response
 * - `prompt`: prompt rendering and default instructions
 * - `request`: streaming accumulation and cancellation
 * - `response`: the translation record returned by a client
 * - `translator`: the scene/batch translation loop
 */

pub mod client;
pub mod context;
pub mod events;
pub mod parser;
pub mod prompt;
pub mod request;
pub mod response;
pub mod translator;

pub use self::client::TranslationClient;
pub use self::context::BatchContext;
pub use self::events::{FanOutEvents, LoggingEvents, NoEvents, TranslationEvents};
pub use self::parser::{ParsedTranslation, TranslationParser};
pub use self::prompt::{MessageRole, PromptMessage, TranslationPrompt};
pub use self::request::{AbortHandle, StreamingAccumulator, StreamingCallback, TranslationRequest};
pub use self::response::Translation;
pub use self::translator::{SubtitleTranslator, TranslationReport, TranslatorOptions, TranslatorState};
