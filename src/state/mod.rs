// State management module
// Handles application state, agent registry, and persistence

pub mod app_state;
pub mod config;
pub mod persistence;

pub use app_state::{AgentId, AgentRecord, AppState};
pub use config::AgentConfig;
pub use persistence::{AgentStore, PersistenceError, TemplateRecord, TemplateStore};
