//! Agent management API handlers
//!
//! Contains HTTP request handlers for agent CRUD operations,
//! enable/disable toggling, and config export/import.

use crate::api::utils::RouterState;
use crate::chat::now_rfc3339;
use crate::error::AppError;
use crate::state::{AgentConfig, AgentId, AgentRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Agents list response
#[derive(Serialize)]
pub struct AgentsListResponse {
    /// All agents, sorted by name
    pub agents: Vec<AgentRecord>,
    /// Total number of agents
    pub count: usize,
}

/// Confirmation response for create and import
#[derive(Debug, Serialize)]
pub struct AgentCreatedResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Id assigned to the new agent
    pub agent_id: AgentId,
    /// Human-readable confirmation
    pub message: String,
}

/// Generic success confirmation
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Human-readable confirmation
    pub message: String,
}

/// Toggle response carrying the new enabled state
#[derive(Serialize)]
pub struct ToggleResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// The agent's enabled flag after the toggle
    pub enabled: bool,
    /// "Agent enabled" or "Agent disabled"
    pub message: String,
}

/// Exported agent config with export metadata
#[derive(Serialize)]
pub struct ExportResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// The full agent record
    pub config: AgentRecord,
    /// When the export was produced
    pub export_date: String,
}

/// Import request wrapping a previously exported config
#[derive(Deserialize)]
pub struct ImportAgentRequest {
    /// Config fields to import; record metadata in the payload is ignored
    pub config: AgentConfig,
}

/// GET /api/agents - List all agents
pub async fn list_agents(
    State((state, _, _)): State<RouterState>,
) -> Result<Json<AgentsListResponse>, AppError> {
    let state = state.read().await;
    let agents: Vec<AgentRecord> = state.agents_list().into_iter().cloned().collect();

    Ok(Json(AgentsListResponse {
        count: agents.len(),
        agents,
    }))
}

/// GET /api/agents/:id - Get a specific agent
pub async fn get_agent(
    State((state, _, _)): State<RouterState>,
    Path(id): Path<AgentId>,
) -> Result<Json<AgentRecord>, AppError> {
    let state = state.read().await;
    let record = state
        .get(&id)
        .ok_or_else(|| AppError::AgentNotFound(id.clone()))?;

    Ok(Json(record.clone()))
}

/// POST /api/agents - Create a new agent
pub async fn create_agent(
    State((state, _, _)): State<RouterState>,
    Json(config): Json<AgentConfig>,
) -> Result<(StatusCode, Json<AgentCreatedResponse>), AppError> {
    config.validate().map_err(AppError::InvalidRequest)?;

    let mut state = state.write().await;
    let record = state.create_agent(config)?;

    Ok((
        StatusCode::CREATED,
        Json(AgentCreatedResponse {
            success: true,
            agent_id: record.id,
            message: "Agent created successfully".to_string(),
        }),
    ))
}

/// PUT /api/agents/:id - Update an existing agent
pub async fn update_agent(
    State((state, _, _)): State<RouterState>,
    Path(id): Path<AgentId>,
    Json(config): Json<AgentConfig>,
) -> Result<Json<StatusResponse>, AppError> {
    config.validate().map_err(AppError::InvalidRequest)?;

    let mut state = state.write().await;
    state
        .update_agent(&id, config)?
        .ok_or(AppError::AgentNotFound(id))?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Agent updated successfully".to_string(),
    }))
}

/// DELETE /api/agents/:id - Delete an agent
///
/// Removes the record file, registry entry and cached runtime. History
/// rows are kept.
pub async fn delete_agent(
    State((state, _, _)): State<RouterState>,
    Path(id): Path<AgentId>,
) -> Result<Json<StatusResponse>, AppError> {
    let mut state = state.write().await;
    state
        .remove_agent(&id)?
        .ok_or(AppError::AgentNotFound(id))?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Agent deleted successfully".to_string(),
    }))
}

/// POST /api/agents/:id/toggle - Enable or disable an agent
pub async fn toggle_agent(
    State((state, _, _)): State<RouterState>,
    Path(id): Path<AgentId>,
) -> Result<Json<ToggleResponse>, AppError> {
    let mut state = state.write().await;
    let enabled = state
        .toggle_agent(&id)?
        .ok_or(AppError::AgentNotFound(id))?;

    let message = if enabled {
        "Agent enabled"
    } else {
        "Agent disabled"
    };

    Ok(Json(ToggleResponse {
        success: true,
        enabled,
        message: message.to_string(),
    }))
}

/// GET /api/agents/:id/export - Export an agent's configuration
pub async fn export_agent(
    State((state, _, _)): State<RouterState>,
    Path(id): Path<AgentId>,
) -> Result<Json<ExportResponse>, AppError> {
    let state = state.read().await;
    let record = state
        .get(&id)
        .ok_or_else(|| AppError::AgentNotFound(id.clone()))?;

    Ok(Json(ExportResponse {
        success: true,
        config: record.clone(),
        export_date: now_rfc3339(),
    }))
}

/// POST /api/agents/import - Import an agent configuration
///
/// A fresh id is always assigned, so importing the same payload twice
/// yields two agents.
pub async fn import_agent(
    State((state, _, _)): State<RouterState>,
    Json(request): Json<ImportAgentRequest>,
) -> Result<(StatusCode, Json<AgentCreatedResponse>), AppError> {
    request.config.validate().map_err(AppError::InvalidRequest)?;

    let mut state = state.write().await;
    let record = state.create_agent(request.config)?;

    Ok((
        StatusCode::CREATED,
        Json(AgentCreatedResponse {
            success: true,
            agent_id: record.id,
            message: "Agent imported successfully".to_string(),
        }),
    ))
}
