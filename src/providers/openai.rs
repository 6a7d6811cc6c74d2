//! OpenAI model implementation
//!
//! Calls the chat completions endpoint. System messages ride inline in the
//! messages array, which is the format OpenAI expects.

use crate::providers::{ChatMessage, ChatModel, ModelReply, ModelSettings, ProviderError, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI model client
#[derive(Debug, Clone)]
pub struct OpenAIModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIModel {
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
}

#[async_trait]
impl ChatModel for OpenAIModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelReply, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "OpenAIModel generating chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);

        let openai_messages: Vec<OpenAIMessage> = messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            })
            .collect();

        let request_body = OpenAIRequest {
            model: self.model_id.clone(),
            messages: openai_messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to OpenAI API");
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
            error!(status = %status, body = %body, "OpenAI API returned error status");

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

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI API response");
            ProviderError::Parse {
                provider: PROVIDER,
                detail: e.to_string(),
            }
        })?;

        let content = openai_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or(ProviderError::Empty { provider: PROVIDER })?;

        let usage = openai_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
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

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
