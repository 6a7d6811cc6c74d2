//! Anthropic (Claude) model implementation
//!
//! Calls the messages endpoint. Unlike OpenAI, system messages are not part
//! of the messages array: they are extracted and sent via the dedicated
//! `system` request field.

use crate::providers::{ChatMessage, ChatModel, ModelReply, ModelSettings, ProviderError, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic model client
#[derive(Debug, Clone)]
pub struct AnthropicModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicModel {
    /// Create a client for the given model with an explicit API key
    pub fn with_api_key<S: Into<String>>(model_id: S, api_key: String) -> Self {
        Self {
            model_id: model_id.into(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Override the API base URL
    #[allow(dead_code)] // Used in tests
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// First system message in the history, destined for the `system` field
    fn extract_system_prompt(messages: &[ChatMessage]) -> Option<String> {
        messages
            .iter()
            .find(|msg| msg.role == Role::System)
            .map(|msg| msg.content.clone())
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelReply, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "AnthropicModel generating chat completion"
        );

        let url = format!("{}/messages", self.base_url);

        let system = Self::extract_system_prompt(messages);
        let anthropic_messages: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .map(|msg| AnthropicMessage {
                role: if msg.role == Role::Assistant {
                    "assistant"
                } else {
                    "user"
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect();

        let request_body = AnthropicRequest {
            model: self.model_id.clone(),
            messages: anthropic_messages,
            max_tokens: settings.max_tokens,
            system,
            temperature: settings.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Anthropic API");
                ProviderError::Request {
                    provider: PROVIDER,
                    source: e,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!(status = %status, body = %body, "Anthropic API returned error status");

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited {
                    provider: PROVIDER,
                    body,
                });
            }
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let anthropic_response: AnthropicResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic API response");
            ProviderError::Parse {
                provider: PROVIDER,
                detail: e.to_string(),
            }
        })?;

        let content = anthropic_response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.clone())
            .ok_or(ProviderError::Empty { provider: PROVIDER })?;

        let usage = Some(TokenUsage {
            prompt_tokens: anthropic_response.usage.input_tokens,
            completion_tokens: anthropic_response.usage.output_tokens,
            total_tokens: anthropic_response.usage.input_tokens
                + anthropic_response.usage.output_tokens,
        });

        Ok(ModelReply {
            content,
            model: self.model_id.clone(),
            usage,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Anthropic API request/response structures

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
