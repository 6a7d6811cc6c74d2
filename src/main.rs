//! Agent Dashboard Backend
//!
//! A REST API server for managing LLM-backed chat agents.
//! Provides endpoints for agent CRUD operations, chat dispatch, and usage stats.

mod api;
mod chat;
mod config;
mod error;
mod providers;
mod runtime;
mod state;
mod tools;

use api::utils::RouterState;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chat::HistoryDb;
use config::{Config, ProviderCatalog};
use serde::Serialize;
use state::{AgentStore, AppState, TemplateStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Serialize)]
struct HelloResponse {
    message: String,
    status: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Provider catalog, written with defaults on first run
    let catalog = Arc::new(ProviderCatalog::load_or_init(&config.providers_path())?);

    // Initialize application state
    let app_state = Arc::new(RwLock::new(AppState::new(
        AgentStore::new(config.agents_dir()),
        TemplateStore::new(config.templates_dir()),
    )));

    // Load persisted agents into the registry
    match app_state.write().await.load_agents() {
        Ok(count) => info!("Loaded {} agents from {}", count, config.agents_dir().display()),
        Err(e) => tracing::warn!("Failed to load agents: {}", e),
    }

    // Open the conversation history database
    let db_path = config.db_path();
    let history = Arc::new(HistoryDb::new(&db_path.to_string_lossy()).await?);

    if let Some(days) = config.storage.history_retention_days {
        info!("History retention enabled: {} days", days);
        history.prune_older_than(days).await?;
    }

    let router_state: RouterState = (app_state, history, catalog);

    // Build our application with routes
    let app = Router::new()
        // Health check and hello world
        .route("/", get(hello_world))
        .route("/api/health", get(health_check))
        // Agent management API
        .route(
            "/api/agents",
            get(api::agents::list_agents).post(api::agents::create_agent),
        )
        .route("/api/agents/import", post(api::agents::import_agent))
        .route(
            "/api/agents/:id",
            get(api::agents::get_agent)
                .put(api::agents::update_agent)
                .delete(api::agents::delete_agent),
        )
        .route("/api/agents/:id/toggle", post(api::agents::toggle_agent))
        .route("/api/agents/:id/export", get(api::agents::export_agent))
        // Chat and conversation history
        .route("/api/chat", post(api::chat::chat))
        .route("/api/agents/:id/history", get(api::chat::get_history))
        // Templates and provider models
        .route("/api/templates", get(api::catalog::get_templates))
        .route("/api/models", get(api::catalog::get_models))
        // Usage statistics
        .route("/api/stats", get(api::stats::get_system_stats))
        .route("/api/agents/:id/stats", get(api::stats::get_agent_stats))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Allow CORS for development
        .with_state(router_state);

    // Bind to address from config
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from Agent Dashboard Backend!".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
    })
}
