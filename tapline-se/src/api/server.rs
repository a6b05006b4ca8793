//! HTTP server setup and routing
//!
//! Sets up Axum HTTP server with routes for scan injection, attendance
//! queries, operator notices, and SSE.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::ScanEngine;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<ScanEngine>,
    pub db_pool: Pool<Sqlite>,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Scan injection (kiosk front-ends forward raw reader input)
        .route("/scan/key", post(super::handlers::scan_key))
        .route("/scan/nfc", post(super::handlers::scan_nfc))
        .route("/scan/tuning", get(super::handlers::get_tuning))
        // Attendance re-query surface
        .route("/attendance/recent", get(super::handlers::recent_attendance))
        // Operator notices
        .route("/notices", get(super::handlers::get_notices))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Run HTTP API server until shutdown
pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    info!("Starting HTTP server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind {}: {}", config.bind_addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    Ok(())
}
