//! Google Gemini model implementation
//!
//! Calls the generateContent endpoint. The API key travels as a query
//! parameter, roles map to "user"/"model", and system messages go via the
//! `systemInstruction` field. Safety-blocked prompts come back as HTTP 200
//! with a block reason, so that case is surfaced as an explicit error.

use crate::providers::{ChatMessage, ChatModel, ModelReply, ModelSettings, ProviderError, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini model client
#[derive(Debug, Clone)]
pub struct GeminiModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiModel {
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

    /// Concatenated system messages, destined for `systemInstruction`
    fn extract_system_messages(messages: &[ChatMessage]) -> Option<String> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|msg| msg.role == Role::System)
            .map(|msg| msg.content.as_str())
            .collect();
        if system.is_empty() {
            None
        } else {
            Some(system.join("\n\n"))
        }
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        settings: &ModelSettings,
    ) -> Result<ModelReply, ProviderError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            "GeminiModel generating chat completion"
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_id, self.api_key
        );

        let system_instruction = Self::extract_system_messages(messages);
        let contents: Vec<GeminiContent> = messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .map(|msg| GeminiContent {
                role: if msg.role == Role::Assistant {
                    "model"
                } else {
                    "user"
                }
                .to_string(),
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            })
            .collect();

        let request_body = GeminiRequest {
            contents,
            generation_config: Some(GeminiGenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_tokens,
            }),
            system_instruction: system_instruction.map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart { text }],
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Gemini API");
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
            error!(status = %status, body = %body, "Gemini API returned error status");

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

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini API response");
            ProviderError::Parse {
                provider: PROVIDER,
                detail: e.to_string(),
            }
        })?;

        if let Some(feedback) = &gemini_response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(ProviderError::Blocked {
                    provider: PROVIDER,
                    reason: reason.clone(),
                });
            }
        }

        let content = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|text| !text.is_empty())
            .ok_or(ProviderError::Empty { provider: PROVIDER })?;

        let usage = gemini_response.usage_metadata.map(|meta| {
            let prompt_tokens = meta.prompt_token_count.unwrap_or_default();
            let completion_tokens = meta.candidates_token_count.unwrap_or_default();
            TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: meta
                    .total_token_count
                    .unwrap_or(prompt_tokens + completion_tokens),
            }
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

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(rename = "promptFeedback", alias = "prompt_feedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason", alias = "block_reason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn test_settings() -> ModelSettings {
        ModelSettings {
            temperature: 0.4,
            max_tokens: 150,
        }
    }

    #[test]
    fn test_system_message_concatenation() {
        let messages = vec![
            ChatMessage::system("Rule one."),
            ChatMessage::user("Hello"),
            ChatMessage::system("Rule two."),
        ];
        let system = GeminiModel::extract_system_messages(&messages);
        assert_eq!(system, Some("Rule one.\n\nRule two.".to_string()));

        let no_system = vec![ChatMessage::user("Hello")];
        assert_eq!(GeminiModel::extract_system_messages(&no_system), None);
    }

    #[tokio::test]
    #[serial]
    async fn test_gemini_chat_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "Hi from Gemini"}],
                            "role": "model"
                        }
                    }],
                    "usageMetadata": {
                        "promptTokenCount": 8,
                        "candidatesTokenCount": 4,
                        "totalTokenCount": 12
                    }
                }"#,
            )
            .create_async()
            .await;

        let model = GeminiModel::with_api_key("gemini-pro", "test-key".to_string())
            .with_base_url(server.url());
        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("Hello"),
        ];
        let reply = model.chat(&messages, &test_settings()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply.content, "Hi from Gemini");
        assert_eq!(
            reply.usage,
            Some(TokenUsage {
                prompt_tokens: 8,
                completion_tokens: 4,
                total_tokens: 12
            })
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_gemini_chat_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [],
                    "promptFeedback": {"blockReason": "SAFETY"}
                }"#,
            )
            .create_async()
            .await;

        let model = GeminiModel::with_api_key("gemini-pro", "test-key".to_string())
            .with_base_url(server.url());
        let messages = vec![ChatMessage::user("Hello")];
        let result = model.chat(&messages, &test_settings()).await;

        mock.assert_async().await;
        match result {
            Err(ProviderError::Blocked { reason, .. }) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked error, got: {:?}", other.map(|r| r.content)),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_gemini_chat_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let model = GeminiModel::with_api_key("gemini-pro", "test-key".to_string())
            .with_base_url(server.url());
        let messages = vec![ChatMessage::user("Hello")];
        let result = model.chat(&messages, &test_settings()).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(ProviderError::Empty { provider: "gemini" })
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_gemini_chat_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let model = GeminiModel::with_api_key("gemini-pro", "test-key".to_string())
            .with_base_url(server.url());
        let messages = vec![ChatMessage::user("Hello")];
        let result = model.chat(&messages, &test_settings()).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(ProviderError::Parse { provider: "gemini", .. })
        ));
    }
}
