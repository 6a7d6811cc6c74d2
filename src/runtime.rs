//! Agent runtime construction and chat dispatch
//!
//! Turns a persisted agent record into a runnable model client with its
//! system prompt, sampling settings and resolved tools attached.

use crate::config::ProviderCatalog;
use crate::providers::{
    AnthropicModel, ChatMessage, ChatModel, GeminiModel, MockModel, ModelReply, ModelSettings,
    OpenAIModel, ProviderError, ProviderKind,
};
use crate::state::AgentRecord;
use crate::tools::{self, ToolSpec};
use thiserror::Error;
use tracing::debug;

/// Errors raised while turning an agent record into a runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The config names a provider the application does not know
    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    /// The provider's API key environment variable is unset or empty
    #[error("Missing API key for {provider}: environment variable {env_var} is not set")]
    MissingApiKey {
        /// Provider that needs the key
        provider: String,
        /// Environment variable that should hold it
        env_var: String,
    },
}

/// A runnable agent: model client plus the config baked in at build time
pub struct AgentRuntime {
    agent_id: String,
    model: Box<dyn ChatModel>,
    system_prompt: String,
    settings: ModelSettings,
    tools: Vec<&'static ToolSpec>,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent_id", &self.agent_id)
            .field("system_prompt", &self.system_prompt)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AgentRuntime {
    /// Build a runtime from a persisted record
    ///
    /// Resolves the provider against the catalog, reads the API key from
    /// the environment and looks up the config's tools. Unknown tool
    /// names are skipped; an unknown provider or missing key is an error.
    pub fn from_record(
        record: &AgentRecord,
        catalog: &ProviderCatalog,
    ) -> Result<Self, RuntimeError> {
        let kind = record
            .config
            .provider
            .parse::<ProviderKind>()
            .map_err(|_| RuntimeError::UnsupportedProvider(record.config.provider.clone()))?;

        let model = build_model(kind, &record.config.model, catalog)?;
        let tools = tools::resolve(&record.config.tools);

        debug!(
            "Built runtime for agent {} ({} {})",
            record.id, record.config.provider, record.config.model
        );

        Ok(Self {
            agent_id: record.id.clone(),
            model,
            system_prompt: record.config.system_prompt.clone(),
            settings: ModelSettings {
                temperature: record.config.temperature,
                max_tokens: record.config.max_tokens,
            },
            tools,
        })
    }

    /// Send one user message to the model, prefixed by the system prompt
    pub async fn chat(&self, user_message: &str) -> Result<ModelReply, ProviderError> {
        debug!("Dispatching chat for agent {}", self.agent_id);

        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        messages.push(ChatMessage::user(user_message));

        self.model.chat(&messages, &self.settings).await
    }

    /// The model identifier this runtime dispatches to
    #[allow(dead_code)] // Used in tests
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Tools resolved from the agent's config
    #[allow(dead_code)] // Used in tests
    pub fn tools(&self) -> &[&'static ToolSpec] {
        &self.tools
    }
}

fn build_model(
    kind: ProviderKind,
    model_id: &str,
    catalog: &ProviderCatalog,
) -> Result<Box<dyn ChatModel>, RuntimeError> {
    match kind {
        ProviderKind::Mock => Ok(Box::new(MockModel::new(model_id))),
        ProviderKind::OpenAI => {
            let api_key = resolve_api_key(kind, catalog)?;
            Ok(Box::new(OpenAIModel::with_api_key(model_id, api_key)))
        }
        ProviderKind::Anthropic => {
            let api_key = resolve_api_key(kind, catalog)?;
            Ok(Box::new(AnthropicModel::with_api_key(model_id, api_key)))
        }
        ProviderKind::Gemini => {
            let api_key = resolve_api_key(kind, catalog)?;
            Ok(Box::new(GeminiModel::with_api_key(model_id, api_key)))
        }
    }
}

/// Read the provider's API key, honoring a catalog override of the
/// environment variable name
fn resolve_api_key(kind: ProviderKind, catalog: &ProviderCatalog) -> Result<String, RuntimeError> {
    let env_var = catalog
        .entry(kind.as_str())
        .map(|entry| entry.api_key_env.clone())
        .or_else(|| kind.default_api_key_env().map(str::to_string))
        .ok_or_else(|| RuntimeError::UnsupportedProvider(kind.as_str().to_string()))?;

    match std::env::var(&env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(RuntimeError::MissingApiKey {
            provider: kind.as_str().to_string(),
            env_var,
        }),
    }
}
