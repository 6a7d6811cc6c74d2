//! Agent configuration module
//!
//! Defines the structure of an agent configuration as accepted by the API
//! and stored on disk.
//!
//! This module handles agent-level configuration (prompt, provider, model,
//! sampling parameters). For application-level configuration (server settings,
//! storage paths, provider catalog), see `config`.

use serde::{Deserialize, Serialize};

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_enabled() -> bool {
    true
}

/// Agent configuration structure
/// Contains all configurable settings for an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Display name of the agent
    pub name: String,
    /// Short human-readable description
    pub description: String,
    /// System prompt sent to the model at the start of every exchange
    pub system_prompt: String,
    /// Model provider name (e.g., "openai", "anthropic", "gemini")
    pub provider: String,
    /// Model identifier within the provider (e.g., "gpt-4")
    pub model: String,
    /// Sampling temperature passed to the model
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum number of tokens the model may generate per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Names of tools available to the agent
    #[serde(default)]
    pub tools: Vec<String>,
    /// Whether the agent accepts chat requests
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            system_prompt: String::new(),
            provider: String::new(),
            model: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            tools: Vec::new(),
            enabled: default_enabled(),
        }
    }
}

impl AgentConfig {
    /// Validate the configuration
    /// Returns Ok(()) if valid, Err with message if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Agent name cannot be empty".to_string());
        }
        if self.provider.trim().is_empty() {
            return Err("Model provider cannot be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert!(config.name.is_empty());
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1000);
        assert!(config.tools.is_empty());
        assert!(config.enabled);
    }

    #[test]
    fn test_agent_config_validate() {
        let mut config = AgentConfig::default();
        assert!(config.validate().is_err());

        config.name = "Helper".to_string();
        assert!(config.validate().is_err());

        config.provider = "openai".to_string();
        config.model = "gpt-4".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_agent_config_serde_defaults() {
        // Optional fields fall back to their defaults when omitted
        let json = r#"{
            "name": "Helper",
            "description": "General helper",
            "system_prompt": "You are helpful.",
            "provider": "openai",
            "model": "gpt-3.5-turbo"
        }"#;
        let config: AgentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1000);
        assert!(config.tools.is_empty());
        assert!(config.enabled);
    }

    #[test]
    fn test_agent_config_serialization() {
        let config = AgentConfig {
            name: "Helper".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            tools: vec!["calculator".to_string()],
            ..AgentConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AgentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
