// Application state management
// Contains the agent registry, cached runtimes, and startup metadata

use crate::chat::models::now_rfc3339;
use crate::config::ProviderCatalog;
use crate::runtime::{AgentRuntime, RuntimeError};
use crate::state::config::AgentConfig;
use crate::state::persistence::{AgentStore, PersistenceError, TemplateStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Unique identifier for an agent
pub type AgentId = String;

/// A stored agent: its configuration plus registry metadata
///
/// Serializes flat, so the on-disk document and the API representation
/// carry the configuration fields alongside `id` and the timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// The agent's configuration
    #[serde(flatten)]
    pub config: AgentConfig,
    /// When the agent was created
    pub created_at: String,
    /// When the agent was last modified
    pub updated_at: String,
}

impl AgentRecord {
    /// Create a new record with a fresh ID and current timestamps
    pub fn new(config: AgentConfig) -> Self {
        let now = now_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Main application state
///
/// Holds the in-memory agent registry backed by the file store, plus a
/// cache of built runtimes so repeat chats skip provider setup.
pub struct AppState {
    /// Registry of all agents (id -> record)
    pub agents: HashMap<AgentId, AgentRecord>,
    runtimes: HashMap<AgentId, Arc<AgentRuntime>>,
    store: AgentStore,
    templates: TemplateStore,
    started_at: Instant,
}

impl AppState {
    /// Create application state backed by the given stores
    pub fn new(store: AgentStore, templates: TemplateStore) -> Self {
        Self {
            agents: HashMap::new(),
            runtimes: HashMap::new(),
            store,
            templates,
            started_at: Instant::now(),
        }
    }

    /// Load all agents from disk, replacing the in-memory registry
    /// Returns the number of agents loaded
    pub fn load_agents(&mut self) -> Result<usize, PersistenceError> {
        let loaded = self.store.load_all()?;
        let count = loaded.len();
        self.agents = loaded;
        self.runtimes.clear();
        Ok(count)
    }

    /// Get an agent record by ID
    pub fn get(&self, id: &str) -> Option<&AgentRecord> {
        self.agents.get(id)
    }

    /// Get all agents as a vector, sorted by name
    pub fn agents_list(&self) -> Vec<&AgentRecord> {
        let mut agents: Vec<&AgentRecord> = self.agents.values().collect();
        agents.sort_by(|a, b| a.config.name.cmp(&b.config.name));
        agents
    }

    /// Create a new agent and persist it
    pub fn create_agent(&mut self, config: AgentConfig) -> Result<AgentRecord, PersistenceError> {
        let record = AgentRecord::new(config);
        self.store.save(&record)?;
        self.agents.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    /// Replace an agent's configuration, keeping its ID and creation time
    /// Returns the updated record, or None if the agent does not exist
    pub fn update_agent(
        &mut self,
        id: &str,
        config: AgentConfig,
    ) -> Result<Option<AgentRecord>, PersistenceError> {
        let Some(current) = self.agents.get(id) else {
            return Ok(None);
        };

        let mut record = current.clone();
        record.config = config;
        record.updated_at = now_rfc3339();

        self.store.save(&record)?;
        self.agents.insert(record.id.clone(), record.clone());
        self.invalidate_runtime(id);
        Ok(Some(record))
    }

    /// Flip an agent's enabled flag and persist the change
    /// Returns the new enabled state, or None if the agent does not exist
    pub fn toggle_agent(&mut self, id: &str) -> Result<Option<bool>, PersistenceError> {
        let Some(current) = self.agents.get(id) else {
            return Ok(None);
        };

        let mut record = current.clone();
        record.config.enabled = !record.config.enabled;
        record.updated_at = now_rfc3339();
        let enabled = record.config.enabled;

        self.store.save(&record)?;
        self.agents.insert(record.id.clone(), record);
        self.invalidate_runtime(id);
        Ok(Some(enabled))
    }

    /// Remove an agent from the registry and delete its file
    /// Returns the removed record if it existed
    pub fn remove_agent(&mut self, id: &str) -> Result<Option<AgentRecord>, PersistenceError> {
        if !self.agents.contains_key(id) {
            return Ok(None);
        }
        self.store.delete(id)?;
        self.invalidate_runtime(id);
        Ok(self.agents.remove(id))
    }

    /// Get or build the runtime for an agent
    ///
    /// Built runtimes are cached until the agent is updated, toggled,
    /// or removed.
    pub fn runtime_for(
        &mut self,
        record: &AgentRecord,
        catalog: &ProviderCatalog,
    ) -> Result<Arc<AgentRuntime>, RuntimeError> {
        if let Some(runtime) = self.runtimes.get(&record.id) {
            return Ok(runtime.clone());
        }

        let runtime = Arc::new(AgentRuntime::from_record(record, catalog)?);
        self.runtimes.insert(record.id.clone(), runtime.clone());
        Ok(runtime)
    }

    /// Drop the cached runtime for an agent, if any
    pub fn invalidate_runtime(&mut self, id: &str) {
        self.runtimes.remove(id);
    }

    /// The template store backing `/api/templates`
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Get the number of agents in the registry
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Get the number of enabled agents
    pub fn enabled_count(&self) -> usize {
        self.agents.values().filter(|a| a.config.enabled).count()
    }

    /// Seconds elapsed since this state was created
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_state(temp_dir: &TempDir) -> AppState {
        let agents_dir = temp_dir.path().join("agents");
        AppState::new(
            AgentStore::new(&agents_dir),
            TemplateStore::new(agents_dir.join("templates")),
        )
    }

    fn mock_config(name: &str) -> AgentConfig {
        AgentConfig {
            name: name.to_string(),
            description: "test agent".to_string(),
            system_prompt: "You are a test agent.".to_string(),
            provider: "mock".to_string(),
            model: "mock-model".to_string(),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_create_and_get_agent() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let record = state.create_agent(mock_config("Helper")).unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(state.agent_count(), 1);
        assert_eq!(state.get(&record.id), Some(&record));
    }

    #[test]
    fn test_create_persists_to_disk() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let record = state.create_agent(mock_config("Helper")).unwrap();

        let mut reloaded = test_state(&temp_dir);
        assert_eq!(reloaded.load_agents().unwrap(), 1);
        assert_eq!(reloaded.get(&record.id), Some(&record));
    }

    #[test]
    fn test_update_agent_preserves_created_at() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let record = state.create_agent(mock_config("Helper")).unwrap();

        let mut new_config = mock_config("Renamed");
        new_config.temperature = 0.2;
        let updated = state
            .update_agent(&record.id, new_config)
            .unwrap()
            .expect("agent should exist");

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.created_at, record.created_at);
        assert_eq!(updated.config.name, "Renamed");
        assert_eq!(updated.config.temperature, 0.2);
    }

    #[test]
    fn test_update_missing_agent_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let result = state.update_agent("missing", mock_config("Ghost")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_toggle_agent_flips_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let record = state.create_agent(mock_config("Helper")).unwrap();
        assert!(record.config.enabled);

        assert_eq!(state.toggle_agent(&record.id).unwrap(), Some(false));
        assert_eq!(state.toggle_agent(&record.id).unwrap(), Some(true));
        assert_eq!(state.toggle_agent("missing").unwrap(), None);
    }

    #[test]
    fn test_remove_agent_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let record = state.create_agent(mock_config("Helper")).unwrap();
        let agent_file = temp_dir
            .path()
            .join("agents")
            .join(format!("{}.json", record.id));
        assert!(agent_file.exists());

        let removed = state.remove_agent(&record.id).unwrap();
        assert_eq!(removed.map(|r| r.id), Some(record.id));
        assert!(!agent_file.exists());
        assert_eq!(state.agent_count(), 0);
    }

    #[test]
    fn test_agents_list_sorted_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        state.create_agent(mock_config("Beta")).unwrap();
        state.create_agent(mock_config("Alpha")).unwrap();
        state.create_agent(mock_config("Gamma")).unwrap();

        let names: Vec<&str> = state
            .agents_list()
            .iter()
            .map(|a| a.config.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_enabled_count() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);

        let first = state.create_agent(mock_config("Alpha")).unwrap();
        state.create_agent(mock_config("Beta")).unwrap();
        assert_eq!(state.enabled_count(), 2);

        state.toggle_agent(&first.id).unwrap();
        assert_eq!(state.enabled_count(), 1);
    }

    #[test]
    fn test_runtime_cache_invalidated_on_update() {
        let temp_dir = TempDir::new().unwrap();
        let mut state = test_state(&temp_dir);
        let catalog = ProviderCatalog::default();

        let record = state.create_agent(mock_config("Helper")).unwrap();
        let first = state.runtime_for(&record, &catalog).unwrap();
        let second = state.runtime_for(&record, &catalog).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let updated = state
            .update_agent(&record.id, mock_config("Helper"))
            .unwrap()
            .expect("agent should exist");
        let third = state.runtime_for(&updated, &catalog).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
