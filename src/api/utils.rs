//! API utility functions
//!
//! Contains the shared router state type and request validation helpers
//! used by API handlers.

use crate::chat::HistoryDb;
use crate::config::ProviderCatalog;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state handed to every route
pub type RouterState = (Arc<RwLock<AppState>>, Arc<HistoryDb>, Arc<ProviderCatalog>);

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000; // 10KB max message length

/// Validate a chat message
///
/// # Arguments
/// * `message` - Message text to validate
///
/// # Returns
/// * `Ok(())` - Message is valid
/// * `Err(AppError)` - Message is invalid (empty or too long)
pub fn validate_message(message: &str) -> Result<(), AppError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_MESSAGE_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}
