//! Statistics API handlers
//!
//! Aggregate application counters and per-agent usage stats.

use crate::api::utils::RouterState;
use crate::chat::AgentStats;
use crate::error::AppError;
use crate::state::AgentId;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

/// Aggregate application counters
#[derive(Serialize)]
pub struct SystemStats {
    /// Number of registered agents
    pub total_agents: usize,
    /// Number of enabled agents
    pub active_agents: usize,
    /// Stored exchanges across all agents
    pub total_conversations: i64,
    /// Seconds since the server started
    pub uptime_seconds: u64,
}

/// System stats response
#[derive(Serialize)]
pub struct SystemStatsResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// The counters
    pub stats: SystemStats,
}

/// Per-agent stats response
#[derive(Debug, Serialize)]
pub struct AgentStatsResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Usage counters; null when the agent has never chatted
    pub stats: Option<AgentStats>,
}

/// GET /api/stats - System statistics
pub async fn get_system_stats(
    State((state, history, _)): State<RouterState>,
) -> Result<Json<SystemStatsResponse>, AppError> {
    let total_conversations = history.total_conversations().await?;
    let state = state.read().await;

    Ok(Json(SystemStatsResponse {
        success: true,
        stats: SystemStats {
            total_agents: state.agent_count(),
            active_agents: state.enabled_count(),
            total_conversations,
            uptime_seconds: state.uptime_seconds(),
        },
    }))
}

/// GET /api/agents/:id/stats - Usage counters for one agent
///
/// 404 when the agent is unknown; `stats` is null when it exists but
/// has never completed an exchange.
pub async fn get_agent_stats(
    State((state, history, _)): State<RouterState>,
    Path(id): Path<AgentId>,
) -> Result<Json<AgentStatsResponse>, AppError> {
    {
        let state = state.read().await;
        if state.get(&id).is_none() {
            return Err(AppError::AgentNotFound(id));
        }
    }

    let stats = history.agent_stats(&id).await?;

    Ok(Json(AgentStatsResponse {
        success: true,
        stats,
    }))
}
