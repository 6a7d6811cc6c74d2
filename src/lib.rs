//! Agent Dashboard Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod providers;
pub mod runtime;
/// Application state management
///
/// Handles the agent registry, cached runtimes, and persistence.
pub mod state;
pub mod tools;
