//! Template and model catalog API handlers
//!
//! Read-only endpoints listing the agent templates on disk and the
//! models available from configured providers.

use crate::api::utils::RouterState;
use crate::error::AppError;
use crate::state::TemplateRecord;
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// Templates response
#[derive(Serialize)]
pub struct TemplatesResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Available templates, sorted by template id
    pub templates: Vec<TemplateRecord>,
}

/// Available models response
#[derive(Serialize)]
pub struct ModelsResponse {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Models grouped by provider; configured providers only
    pub models: BTreeMap<String, Vec<String>>,
}

/// GET /api/templates - List available agent templates
pub async fn get_templates(
    State((state, _, _)): State<RouterState>,
) -> Result<Json<TemplatesResponse>, AppError> {
    let state = state.read().await;
    let templates = state.templates().load_or_init()?;

    Ok(Json(TemplatesResponse {
        success: true,
        templates,
    }))
}

/// GET /api/models - Models available from configured providers
pub async fn get_models(
    State((_, _, catalog)): State<RouterState>,
) -> Result<Json<ModelsResponse>, AppError> {
    Ok(Json(ModelsResponse {
        success: true,
        models: catalog.available_models(),
    }))
}
