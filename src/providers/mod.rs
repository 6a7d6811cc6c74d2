//! Model provider abstraction
//!
//! Defines the `ChatModel` trait implemented by each supported provider,
//! the shared message/settings/reply types, and the provider error taxonomy.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub use anthropic::AnthropicModel;
pub use gemini::GeminiModel;
pub use openai::OpenAIModel;

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions injected ahead of the conversation
    System,
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Assistant,
}

impl Role {
    /// Wire-format name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message
    #[allow(dead_code)] // Used in tests
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling settings forwarded to the provider on every call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens the model may generate
    pub max_tokens: u32,
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the reply
    pub completion_tokens: u32,
    /// Total tokens for the round trip
    pub total_tokens: u32,
}

/// A completed model reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    /// The generated text
    pub content: String,
    /// Model that produced the reply
    pub model: String,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

/// Errors returned by provider calls
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP request never completed
    #[error("failed to reach {provider}: {source}")]
    Request {
        /// Provider that was called
        provider: &'static str,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The provider returned a non-success status
    #[error("{provider} API error (status {status}): {body}")]
    Api {
        /// Provider that was called
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The provider rejected the request with HTTP 429
    #[error("{provider} rate limit exceeded: {body}")]
    RateLimited {
        /// Provider that was called
        provider: &'static str,
        /// Response body text
        body: String,
    },

    /// The provider refused to answer the prompt
    #[error("{provider} blocked the prompt: {reason}")]
    Blocked {
        /// Provider that was called
        provider: &'static str,
        /// Block reason reported by the provider
        reason: String,
    },

    /// The response body could not be parsed
    #[error("failed to parse {provider} response: {detail}")]
    Parse {
        /// Provider that was called
        provider: &'static str,
        /// Parse failure detail
        detail: String,
    },

    /// The response carried no usable content
    #[error("{provider} response contained no content")]
    Empty {
        /// Provider that was called
        provider: &'static str,
    },
}

/// A chat-capable model client
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a conversation to the model and return its reply
    async fn chat(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelReply, ProviderError>;

    /// Model identifier this client calls
    fn model_id(&self) -> &str;
}

/// The set of supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAI,
    /// Anthropic messages
    Anthropic,
    /// Google Gemini
    Gemini,
    /// In-process mock for tests and offline use
    Mock,
}

impl ProviderKind {
    /// Canonical lowercase name of the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Mock => "mock",
        }
    }

    /// Environment variable conventionally holding the provider's API key
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Mock => None,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(()),
        }
    }
}

/// Deterministic model used by tests and offline development
///
/// Echoes the last user message and reports whitespace-token usage.
#[derive(Debug, Clone)]
pub struct MockModel {
    model_id: String,
}

impl MockModel {
    /// Create a mock model with the given model ID
    pub fn new<S: Into<String>>(model_id: S) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[async_trait]
impl ChatModel for MockModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _settings: &ModelSettings,
    ) -> Result<ModelReply, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let content = format!("Mock reply to: {}", last_user);
        let prompt_tokens: u32 = messages.iter().map(|m| count_tokens(&m.content)).sum();
        let completion_tokens = count_tokens(&content);

        Ok(ModelReply {
            content,
            model: self.model_id.clone(),
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
