/*!
 * Prompt construction for batch translation.
 *
 * The user message carries the request line, the batch context in XML-style
 * tags and one block per subtitle line:
 *
 * ```text
 * #12
 * Original>
 * Where are you going?
 * Translation>
 * ```
 *
 * Responses are expected to echo the same blocks with the translation
 * filled in, followed by `<summary>` and `<scene>` tags.
 */

use serde::{Deserialize, Serialize};

use super::context::BatchContext;
use crate::document::SubtitleLine;
use crate::errors::TranslationError;

/// Request line; the bracketed parts are filled from the context or dropped
pub const DEFAULT_USER_PROMPT: &str = "Translate these subtitles [ for movie][ to language]";

pub const DEFAULT_INSTRUCTIONS: &str = r#"The goal is to accurately translate subtitles into a target language.

You will receive a batch of lines for translation. Carefully read through the lines, along with any additional context provided.
Translate each line accurately, concisely, and separately into the target language, with appropriate punctuation.

The translation must have the same number of lines as the original, but you can adapt the content to fit the grammar of the target language.
Make sure to translate all provided lines and do not ask whether to continue.

Use any provided context to enhance your translations. If a name list is provided, ensure names are spelled according to the user's preference.
If you detect obvious errors in the input, correct them in the translation using the available context, but do not improvise.

At the end you should add <summary> and <scene> tags with information about the translation:
<summary>A one or two line synopsis of the current batch.</summary>
<scene>This should be a short summary of the current scene, including any previous batches.</scene>
If the context is unclear, just summarize the dialogue.

Your response will be processed by an automated system, so you MUST respond using the required format:

#200
Original>
変わりゆく時代において、
Translation>
In an ever-changing era,

#501
Original>
進化し続けることが生き残る秘訣です。
Translation>
continuing to evolve is the key to survival."#;

pub const DEFAULT_RETRY_INSTRUCTIONS: &str = r#"There was an issue with the previous translation.

Translate the subtitles again, ensuring each line is translated SEPARATELY, and EVERY line has a corresponding translation.

Do NOT merge lines together in the translation, it leads to incorrect timings and confusion for the reader."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A rendered prompt for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationPrompt {
    /// System instructions
    pub instructions: String,

    /// Rendered request line
    pub user_prompt: String,

    /// Lines to translate
    pub lines: Vec<SubtitleLine>,

    /// Context the prompt was built from
    pub context: BatchContext,

    /// Full user message
    pub content: String,

    /// Messages for chat-style providers
    pub messages: Vec<PromptMessage>,
}

impl TranslationPrompt {
    /// Render a prompt, failing if there is nothing to translate or no instructions
    pub fn build(
        user_prompt: &str,
        instructions: &str,
        lines: &[SubtitleLine],
        context: &BatchContext,
    ) -> Result<Self, TranslationError> {
        if lines.is_empty() {
            return Err(TranslationError::fatal("No lines to translate"));
        }
        if instructions.trim().is_empty() {
            return Err(TranslationError::fatal("No instructions provided"));
        }

        let user_prompt = Self::render_user_prompt(user_prompt, context);
        let content = [
            user_prompt.clone(),
            Self::format_context(context),
            Self::format_lines(lines),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

        let messages = vec![
            PromptMessage::new(MessageRole::System, instructions),
            PromptMessage::new(MessageRole::User, content.clone()),
        ];

        Ok(Self {
            instructions: instructions.to_string(),
            user_prompt,
            lines: lines.to_vec(),
            context: context.clone(),
            content,
            messages,
        })
    }

    /// Fill in `[ for movie]` and `[ to language]`
    pub fn render_user_prompt(template: &str, context: &BatchContext) -> String {
        let movie = context
            .movie_name
            .as_deref()
            .map(|name| format!(" for {}", name))
            .unwrap_or_default();
        let language = context
            .target_language
            .as_deref()
            .map(|language| format!(" to {}", language))
            .unwrap_or_default();

        template
            .replace("[ for movie]", &movie)
            .replace("[ to language]", &language)
            .trim()
            .to_string()
    }

    pub fn format_context(context: &BatchContext) -> String {
        let mut parts = Vec::new();

        if let Some(description) = &context.description {
            parts.push(format!("<description>{}</description>", description));
        }
        if !context.names.is_empty() {
            parts.push(format!("<names>{}</names>", context.names.join(", ")));
        }
        if !context.history.is_empty() {
            parts.push(format!("<history>\n{}\n</history>", context.history.join("\n")));
        }
        if !context.scene.is_empty() {
            parts.push(format!("<scene>{}</scene>", context.scene));
        }
        if !context.batch.is_empty() {
            parts.push(format!("<batch>{}</batch>", context.batch));
        }

        if parts.is_empty() {
            return String::new();
        }
        format!("<context>\n{}\n</context>", parts.join("\n"))
    }

    pub fn format_lines(lines: &[SubtitleLine]) -> String {
        lines
            .iter()
            .map(|line| format!("#{}\nOriginal>\n{}\nTranslation>\n", line.number, line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn line_numbers(&self) -> Vec<usize> {
        self.lines.iter().map(|line| line.number).collect()
    }
}
