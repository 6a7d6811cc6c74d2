//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults, plus the provider catalog persisted as JSON in
//! the data directory.

use crate::state::PersistenceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for agent records, templates, catalog and history
    pub data_dir: PathBuf,
    /// Days of conversation history to keep; `None` disables pruning
    pub history_retention_days: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            storage: StorageConfig {
                data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
                    // Default to ~/.agent-dashboard or current directory
                    if let Some(home) = env::var_os("HOME") {
                        PathBuf::from(home).join(".agent-dashboard")
                    } else {
                        PathBuf::from(".agent-dashboard")
                    }
                }),
                history_retention_days: env::var("HISTORY_RETENTION_DAYS")
                    .ok()
                    .and_then(|d| d.parse().ok()),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Directory holding persisted agent records
    pub fn agents_dir(&self) -> PathBuf {
        self.storage.data_dir.join("agents")
    }

    /// Directory holding agent templates
    pub fn templates_dir(&self) -> PathBuf {
        self.storage.data_dir.join("templates")
    }

    /// Path of the SQLite conversation history database
    pub fn db_path(&self) -> PathBuf {
        self.storage.data_dir.join("agents.db")
    }

    /// Path of the persisted provider catalog
    pub fn providers_path(&self) -> PathBuf {
        self.storage.data_dir.join("config").join("providers.json")
    }
}

/// The model providers the application knows how to talk to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCatalog {
    /// Provider suggested when a config does not name one
    pub default_provider: String,
    /// Known providers keyed by canonical name
    pub providers: BTreeMap<String, ProviderEntry>,
}

/// Catalog entry for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Environment variable holding the provider's API key
    pub api_key_env: String,
    /// Models offered by this provider
    pub models: Vec<String>,
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderEntry {
                api_key_env: "OPENAI_API_KEY".to_string(),
                models: vec![
                    "gpt-3.5-turbo".to_string(),
                    "gpt-4".to_string(),
                    "gpt-4-turbo-preview".to_string(),
                ],
            },
        );
        providers.insert(
            "anthropic".to_string(),
            ProviderEntry {
                api_key_env: "ANTHROPIC_API_KEY".to_string(),
                models: vec![
                    "claude-3-haiku-20240307".to_string(),
                    "claude-3-sonnet-20240229".to_string(),
                    "claude-3-opus-20240229".to_string(),
                ],
            },
        );
        providers.insert(
            "gemini".to_string(),
            ProviderEntry {
                api_key_env: "GEMINI_API_KEY".to_string(),
                models: vec!["gemini-pro".to_string(), "gemini-pro-vision".to_string()],
            },
        );

        Self {
            default_provider: "openai".to_string(),
            providers,
        }
    }
}

impl ProviderCatalog {
    /// Load the catalog from disk, writing the default catalog on first run
    pub fn load_or_init(path: &Path) -> Result<Self, PersistenceError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| PersistenceError::IoError(e.to_string()))?;
            return serde_json::from_str(&contents)
                .map_err(|e| PersistenceError::JsonError(e.to_string()));
        }

        let catalog = Self::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::IoError(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&catalog)
            .map_err(|e| PersistenceError::JsonError(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| PersistenceError::IoError(e.to_string()))?;
        info!("Wrote default provider catalog to {}", path.display());

        Ok(catalog)
    }

    /// Get the catalog entry for a provider, if known
    pub fn entry(&self, provider: &str) -> Option<&ProviderEntry> {
        self.providers.get(provider)
    }

    /// Whether a provider's API key environment variable is set and non-empty
    pub fn is_configured(&self, provider: &str) -> bool {
        self.entry(provider)
            .map(|entry| {
                env::var(&entry.api_key_env)
                    .map(|key| !key.trim().is_empty())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Models grouped by provider, configured providers only
    pub fn available_models(&self) -> BTreeMap<String, Vec<String>> {
        self.providers
            .iter()
            .filter(|(name, _)| self.is_configured(name))
            .map(|(name, entry)| (name.clone(), entry.models.clone()))
            .collect()
    }
}
