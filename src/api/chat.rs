//! Chat API endpoints
//!
//! Handles chat dispatch to agents and conversation history retrieval.

use crate::api::utils::{validate_message, RouterState};
use crate::chat::{now_rfc3339, Conversation, NewConversation};
use crate::error::AppError;
use crate::providers::TokenUsage;
use crate::state::AgentId;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default number of history rows returned when no limit is given
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

fn default_user_id() -> String {
    "default".to_string()
}

/// Request to send a message to an agent
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Agent to dispatch the message to
    pub agent_id: AgentId,
    /// Message text
    pub message: String,
    /// Caller identity; accepted for compatibility but not used
    #[serde(default = "default_user_id")]
    #[allow(dead_code)]
    pub user_id: String,
}

/// Reply from an agent
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// The agent's reply text
    pub response: String,
    /// Token usage reported by the provider, if any
    pub usage: Option<TokenUsage>,
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Maximum number of rows to return (default 50)
    pub limit: Option<i64>,
}

/// One stored exchange as returned by the API
#[derive(Debug, Serialize)]
pub struct ExchangeRow {
    /// Row identifier
    pub id: i64,
    /// The user's message
    pub user_message: String,
    /// The agent's response
    pub agent_response: String,
    /// When the user message was received
    pub user_timestamp: String,
    /// When the agent response was produced
    pub agent_timestamp: String,
    /// Token usage for the exchange, when the provider reported it
    pub usage: Option<TokenUsage>,
    /// When the row was written
    pub created_at: String,
}

impl From<Conversation> for ExchangeRow {
    fn from(row: Conversation) -> Self {
        let usage = row.usage();
        Self {
            id: row.id,
            user_message: row.user_message,
            agent_response: row.agent_response,
            user_timestamp: row.user_timestamp,
            agent_timestamp: row.agent_timestamp,
            usage,
            created_at: row.created_at,
        }
    }
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Stored exchanges, newest first
    pub history: Vec<ExchangeRow>,
}

/// POST /api/chat - Send a message to an agent and get its reply
///
/// The exchange is persisted after a successful reply; provider
/// failures surface as errors and leave no history row.
pub async fn chat(
    State((state, history, catalog)): State<RouterState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_message(&request.message)?;

    // Resolve the agent and its runtime, releasing the lock before the
    // provider round trip
    let runtime = {
        let mut state = state.write().await;
        let record = state
            .get(&request.agent_id)
            .ok_or_else(|| AppError::AgentNotFound(request.agent_id.clone()))?
            .clone();

        if !record.config.enabled {
            return Err(AppError::AgentDisabled(request.agent_id.clone()));
        }

        state.runtime_for(&record, &catalog)?
    };

    let user_timestamp = now_rfc3339();
    let reply = runtime.chat(&request.message).await?;
    let agent_timestamp = now_rfc3339();

    history
        .record_conversation(&NewConversation {
            agent_id: request.agent_id.clone(),
            user_message: request.message,
            agent_response: reply.content.clone(),
            user_timestamp,
            agent_timestamp,
            usage: reply.usage,
        })
        .await?;

    info!(agent_id = %request.agent_id, model = %reply.model, "Chat exchange completed");

    Ok(Json(ChatResponse {
        success: true,
        response: reply.content,
        usage: reply.usage,
    }))
}

/// GET /api/agents/:id/history - Recent conversation history
///
/// Unknown agent ids yield an empty list rather than a 404, and rows
/// outlive agent deletion.
pub async fn get_history(
    State((_, history, _)): State<RouterState>,
    Path(id): Path<AgentId>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let rows = history.history(&id, limit).await?;

    Ok(Json(HistoryResponse {
        success: true,
        history: rows.into_iter().map(ExchangeRow::from).collect(),
    }))
}
