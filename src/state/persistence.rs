// Agent persistence module
// Stores each agent as a JSON document under the agents directory

use super::app_state::{AgentId, AgentRecord};
use super::config::AgentConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Error types for persistence operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// File I/O error
    IoError(String),
    /// JSON serialization/deserialization error
    JsonError(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::IoError(msg) => write!(f, "IO Error: {}", msg),
            PersistenceError::JsonError(msg) => write!(f, "JSON Error: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// File-backed store for agent records
///
/// Each agent lives in its own `<id>.json` file so that a single corrupt
/// file cannot take out the whole registry.
pub struct AgentStore {
    dir: PathBuf,
}

impl AgentStore {
    /// Create a store rooted at the given directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn agent_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save an agent record to its JSON file
    pub fn save(&self, record: &AgentRecord) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::IoError(e.to_string()))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| PersistenceError::JsonError(e.to_string()))?;

        fs::write(self.agent_path(&record.id), json)
            .map_err(|e| PersistenceError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Delete an agent's JSON file if it exists
    pub fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let path = self.agent_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| PersistenceError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    /// Load all agent records from the store directory
    ///
    /// Files that fail to parse are skipped with a warning so one bad
    /// file does not block startup. Template files are ignored.
    pub fn load_all(&self) -> Result<HashMap<AgentId, AgentRecord>, PersistenceError> {
        let mut agents = HashMap::new();

        if !self.dir.exists() {
            return Ok(agents);
        }

        let entries =
            fs::read_dir(&self.dir).map_err(|e| PersistenceError::IoError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::IoError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Template files share the directory tree but are not agents
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("template_") {
                    continue;
                }
            }

            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Skipping unreadable agent file {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_str::<AgentRecord>(&json) {
                Ok(record) => {
                    agents.insert(record.id.clone(), record);
                }
                Err(e) => {
                    warn!("Skipping invalid agent file {}: {}", path.display(), e);
                }
            }
        }

        Ok(agents)
    }
}

/// A predefined agent configuration offered as a starting point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateRecord {
    /// Identifier derived from the template file name
    #[serde(default)]
    pub template_id: String,
    /// The template's agent configuration
    #[serde(flatten)]
    pub config: AgentConfig,
}

/// File-backed store for agent templates
///
/// Default templates are written on first access when the directory
/// holds none.
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Create a template store rooted at the given directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Load all templates, creating the default set on first access
    pub fn load_or_init(&self) -> Result<Vec<TemplateRecord>, PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::IoError(e.to_string()))?;

        let mut templates = self.load_all()?;
        if templates.is_empty() {
            self.write_defaults()?;
            templates = self.load_all()?;
        }

        templates.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(templates)
    }

    fn load_all(&self) -> Result<Vec<TemplateRecord>, PersistenceError> {
        let mut templates = Vec::new();

        let entries =
            fs::read_dir(&self.dir).map_err(|e| PersistenceError::IoError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::IoError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let json = match fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Skipping unreadable template {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_str::<AgentConfig>(&json) {
                Ok(config) => {
                    let template_id = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default()
                        .to_string();
                    templates.push(TemplateRecord {
                        template_id,
                        config,
                    });
                }
                Err(e) => {
                    warn!("Skipping invalid template {}: {}", path.display(), e);
                }
            }
        }

        Ok(templates)
    }

    fn write_defaults(&self) -> Result<(), PersistenceError> {
        for (index, config) in default_templates().iter().enumerate() {
            let json = serde_json::to_string_pretty(config)
                .map_err(|e| PersistenceError::JsonError(e.to_string()))?;
            let path = self.dir.join(format!("template_{}.json", index + 1));
            fs::write(&path, json).map_err(|e| PersistenceError::IoError(e.to_string()))?;
        }
        Ok(())
    }
}

/// The default template set written on first access
fn default_templates() -> Vec<AgentConfig> {
    vec![
        AgentConfig {
            name: "General Assistant".to_string(),
            description: "A helpful general-purpose AI assistant".to_string(),
            system_prompt: "You are a helpful, harmless, and honest AI assistant. Provide clear, accurate, and helpful responses to user queries.".to_string(),
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            tools: vec![],
            enabled: true,
        },
        AgentConfig {
            name: "Code Assistant".to_string(),
            description: "An AI assistant specialized in programming and software development".to_string(),
            system_prompt: "You are an expert software developer and programming assistant. Help users with coding questions, debugging, code review, and software architecture. Provide clear explanations and working code examples.".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            tools: vec!["file_reader".to_string()],
            enabled: true,
        },
        AgentConfig {
            name: "Research Assistant".to_string(),
            description: "An AI assistant for research and information gathering".to_string(),
            system_prompt: "You are a research assistant that helps users find, analyze, and synthesize information. Provide well-researched, accurate, and comprehensive responses with proper citations when possible.".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.5,
            max_tokens: 1500,
            tools: vec!["web_search".to_string()],
            enabled: true,
        },
        AgentConfig {
            name: "Math Tutor".to_string(),
            description: "An AI tutor specialized in mathematics".to_string(),
            system_prompt: "You are a patient and knowledgeable mathematics tutor. Help students understand mathematical concepts, solve problems step-by-step, and provide clear explanations. Encourage learning and build confidence.".to_string(),
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.4,
            max_tokens: 1200,
            tools: vec!["calculator".to_string()],
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config(name: &str) -> AgentConfig {
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
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = AgentStore::new(temp_dir.path());

        let record = AgentRecord::new(sample_config("Agent A"));
        store.save(&record).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&record.id), Some(&record));
    }

    #[test]
    fn test_load_skips_invalid_and_template_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = AgentStore::new(temp_dir.path());

        let record = AgentRecord::new(sample_config("Agent A"));
        store.save(&record).unwrap();

        std::fs::write(temp_dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(temp_dir.path().join("template_1.json"), "{}").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignore me").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&record.id));
    }

    #[test]
    fn test_load_from_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = AgentStore::new(temp_dir.path().join("does-not-exist"));

        let loaded = store.load_all().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_delete_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = AgentStore::new(temp_dir.path());

        let record = AgentRecord::new(sample_config("Agent A"));
        store.save(&record).unwrap();
        assert!(temp_dir
            .path()
            .join(format!("{}.json", record.id))
            .exists());

        store.delete(&record.id).unwrap();
        assert!(!temp_dir
            .path()
            .join(format!("{}.json", record.id))
            .exists());

        // Deleting a missing agent is not an error
        store.delete("missing").unwrap();
    }

    #[test]
    fn test_templates_created_on_first_access() {
        let temp_dir = TempDir::new().unwrap();
        let store = TemplateStore::new(temp_dir.path().join("templates"));

        let templates = store.load_or_init().unwrap();
        assert_eq!(templates.len(), 4);
        assert_eq!(templates[0].template_id, "template_1");
        assert_eq!(templates[0].config.name, "General Assistant");
        assert_eq!(templates[3].config.tools, vec!["calculator".to_string()]);

        // Second access reads the files written by the first
        let again = store.load_or_init().unwrap();
        assert_eq!(again, templates);
    }
}
