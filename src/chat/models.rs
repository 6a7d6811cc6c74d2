//! Chat data models
//!
//! Defines structures for stored conversation rows and per-agent stats.

use crate::providers::TokenUsage;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Current UTC time as an RFC 3339 string with millisecond precision
///
/// Fixed-width output, so string comparison orders timestamps correctly.
/// Used for every timestamp the application stores.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A stored chat round trip: one user message and the agent's response
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Row identifier
    pub id: i64,
    /// Agent that produced the response
    pub agent_id: String,
    /// The user's message
    pub user_message: String,
    /// The agent's response
    pub agent_response: String,
    /// When the user message was received
    pub user_timestamp: String,
    /// When the agent response was produced
    pub agent_timestamp: String,
    /// JSON-encoded token usage, if the provider reported any
    pub usage_data: Option<String>,
    /// When the row was written
    pub created_at: String,
}

impl Conversation {
    /// Token usage parsed from the stored JSON, if present and valid
    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage_data
            .as_deref()
            .and_then(|data| serde_json::from_str(data).ok())
    }
}

/// A chat round trip waiting to be inserted
#[derive(Debug, Clone)]
pub struct NewConversation {
    /// Agent that produced the response
    pub agent_id: String,
    /// The user's message
    pub user_message: String,
    /// The agent's response
    pub agent_response: String,
    /// When the user message was received
    pub user_timestamp: String,
    /// When the agent response was produced
    pub agent_timestamp: String,
    /// Token usage reported by the provider
    pub usage: Option<TokenUsage>,
}

impl NewConversation {
    /// The usage encoded as JSON for the `usage_data` column
    pub fn usage_json(&self) -> Option<String> {
        self.usage
            .as_ref()
            .and_then(|usage| serde_json::to_string(usage).ok())
    }

    /// Total tokens consumed by this exchange, for the stats counters
    pub fn total_tokens(&self) -> i64 {
        self.usage
            .as_ref()
            .map(|usage| i64::from(usage.total_tokens))
            .unwrap_or(0)
    }
}

/// Accumulated usage counters for one agent
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgentStats {
    /// Agent these counters belong to
    pub agent_id: String,
    /// Number of exchanges recorded
    pub total_conversations: i64,
    /// Total tokens across all exchanges
    pub total_tokens_used: i64,
    /// When the agent last completed an exchange
    pub last_used: Option<String>,
    /// When the counters were first written
    pub created_at: String,
    /// When the counters were last bumped
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_rfc3339_format() {
        let now = now_rfc3339();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2026-01-02T03:04:05.678Z".len());
    }

    #[test]
    fn test_conversation_usage_parsing() {
        let mut row = Conversation {
            id: 1,
            agent_id: "a".to_string(),
            user_message: "hi".to_string(),
            agent_response: "hello".to_string(),
            user_timestamp: now_rfc3339(),
            agent_timestamp: now_rfc3339(),
            usage_data: Some(
                r#"{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}"#.to_string(),
            ),
            created_at: now_rfc3339(),
        };

        let usage = row.usage().unwrap();
        assert_eq!(usage.total_tokens, 15);

        row.usage_data = None;
        assert!(row.usage().is_none());

        row.usage_data = Some("not json".to_string());
        assert!(row.usage().is_none());
    }

    #[test]
    fn test_new_conversation_usage_json() {
        let exchange = NewConversation {
            agent_id: "a".to_string(),
            user_message: "hi".to_string(),
            agent_response: "hello".to_string(),
            user_timestamp: now_rfc3339(),
            agent_timestamp: now_rfc3339(),
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        };

        assert_eq!(exchange.total_tokens(), 15);
        let json = exchange.usage_json().unwrap();
        let parsed: TokenUsage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_tokens, 15);

        let no_usage = NewConversation { usage: None, ..exchange };
        assert_eq!(no_usage.total_tokens(), 0);
        assert!(no_usage.usage_json().is_none());
    }
}
