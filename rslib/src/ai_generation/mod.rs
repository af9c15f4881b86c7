//! AI-assisted study content: prompting a completion provider and turning its
//! reply into notes, flashcards and quiz questions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub mod config;
pub mod extract;
pub mod flashcard_parser;
pub mod input_processor;
pub mod notes_parser;
pub mod prompts;
pub mod providers;
pub mod quiz_parser;
pub mod service;
pub mod session;

/// Convenient alias for results returned by the AI generation layer.
pub type AiResult<T> = Result<T>;

pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Completion providers the proxy can forward to. Exactly one is selected by
/// configuration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    /// Messages API; replies arrive as an array of typed content blocks.
    #[default]
    Anthropic,
    /// OpenAI-compatible chat completions; replies arrive as choices.
    Groq,
}

impl ProviderKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Groq => "Groq",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn credential_var(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }
}

/// The three kinds of study content that can be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ContentKind {
    Notes,
    Flashcards,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation. `content` is kept as sent, so callers may use
/// plain strings or a provider's array of content parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Value,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Value::String(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Body accepted by the proxy endpoint, and sent to it by clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Decodes and validates a raw request body. An empty body is treated as
    /// an empty object.
    pub fn from_body(body: &[u8]) -> AiResult<Self> {
        let request: CompletionRequest = if body.iter().all(u8::is_ascii_whitespace) {
            CompletionRequest::default()
        } else {
            match serde_json::from_slice(body) {
                Ok(request) => request,
                Err(err) => crate::invalid_input!(err, "Request body must be a JSON object: {err}"),
            }
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> AiResult<()> {
        if self.messages.is_empty() {
            crate::invalid_input!("Missing required field: messages (array).");
        }
        Ok(())
    }

    /// The system prompt, if one was supplied and is not blank.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system
            .as_deref()
            .filter(|system| !system.trim().is_empty())
    }

    /// The caller's token limit, or `default` when none (or zero) was sent.
    pub fn max_tokens_or(&self, default: u32) -> u32 {
        self.max_tokens.filter(|tokens| *tokens > 0).unwrap_or(default)
    }
}

/// A single-turn request: one fixed instruction plus the user's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub user_message: String,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(
        system_instruction: impl Into<String>,
        user_message: impl Into<String>,
    ) -> AiResult<Self> {
        let user_message = user_message.into();
        if user_message.trim().is_empty() {
            crate::invalid_input!("user message must not be empty");
        }

        Ok(Self {
            system_instruction: system_instruction.into(),
            user_message,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl From<ChatRequest> for CompletionRequest {
    fn from(request: ChatRequest) -> Self {
        CompletionRequest {
            system: Some(request.system_instruction).filter(|system| !system.is_empty()),
            messages: vec![ChatMessage::user(request.user_message)],
            max_tokens: Some(request.max_tokens),
        }
    }
}

/// The normalized reply, whichever provider produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SimplifiedNotes {
    pub topic: String,
    pub key_points: Vec<String>,
    pub key_terms: Vec<KeyTerm>,
}

impl SimplifiedNotes {
    pub fn is_empty(&self) -> bool {
        self.topic.is_empty() && self.key_points.is_empty() && self.key_terms.is_empty()
    }
}
