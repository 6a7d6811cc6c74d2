//! Chat module
//!
//! Handles conversation history and usage stats storage using SQLite.

pub mod db;
pub mod models;

pub use db::HistoryDb;
pub use models::{now_rfc3339, AgentStats, Conversation, NewConversation};
