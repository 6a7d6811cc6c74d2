//! API module
//!
//! Contains HTTP request handlers for agent management, chat dispatch,
//! catalog and statistics endpoints

pub mod agents;
pub mod catalog;
pub mod chat;
pub mod stats;
pub mod utils;
