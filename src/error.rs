//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::providers::ProviderError;
use crate::runtime::RuntimeError;
use crate::state::PersistenceError;

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Agent with the given ID was not found
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Agent exists but is currently disabled
    #[error("Agent is disabled: {0}")]
    AgentDisabled(String),

    /// Request payload failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error occurred while reading or writing agent files
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Agent could not be turned into a runnable model client
    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    /// Upstream model provider returned an error
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::AgentNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::AgentDisabled(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Runtime(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Provider(ProviderError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            AppError::Provider(ProviderError::Blocked { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_not_found_maps_to_404() {
        let response = AppError::AgentNotFound("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_disabled_agent_maps_to_400() {
        let response = AppError::AgentDisabled("abc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rate_limited_maps_to_429() {
        let err = AppError::Provider(ProviderError::RateLimited {
            provider: "openai",
            body: "quota exhausted".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_provider_api_error_maps_to_502() {
        let err = AppError::Provider(ProviderError::Api {
            provider: "gemini",
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
