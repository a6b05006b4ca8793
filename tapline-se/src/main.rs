//! Scan Engine (tapline-se) - Main entry point
//!
//! This is the card-scan ingestion and attendance-resolution service for
//! Tapline: it accepts raw reader input over HTTP, resolves taps against
//! per-site rosters, records attendance facts, and streams outcomes to
//! dashboards and TV boards over SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapline_common::SystemClock;
use tapline_se::api::{self, AppContext};
use tapline_se::config::Config;
use tapline_se::db;
use tapline_se::ingest::ScanEngine;

/// Command-line arguments for tapline-se
#[derive(Parser, Debug)]
#[command(name = "tapline-se")]
#[command(about = "Scan Engine service for Tapline")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "TAPLINE_SE_PORT")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(short, long, default_value = "tapline.db", env = "TAPLINE_DB_PATH")]
    db_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapline_se=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting Tapline Scan Engine on port {}", args.port);
    info!("Database: {}", args.db_path.display());

    let config = Config {
        db_path: args.db_path.clone(),
        bind_addr: format!("0.0.0.0:{}", args.port),
    };

    // Open the store and make sure schema + tuning defaults exist
    let db_pool = db::init::connect(&config.db_path)
        .await
        .context("Failed to open database")?;
    db::init::init_schema(&db_pool)
        .await
        .context("Failed to initialize database schema")?;
    db::init::init_settings_defaults(&db_pool)
        .await
        .context("Failed to initialize settings defaults")?;

    let tuning = db::settings::load_scan_tuning(&db_pool)
        .await
        .context("Failed to load scan tuning")?;
    info!(
        "Scan tuning: min len {}, frame width {}, keystroke gap {:?}, dedup window {:?}",
        tuning.min_identifier_len,
        tuning.identifier_frame_width,
        tuning.keystroke_gap,
        tuning.dedup_window
    );

    // Initialize scan engine
    let engine = ScanEngine::new(db_pool.clone(), tuning, Arc::new(SystemClock))
        .await
        .context("Failed to initialize scan engine")?;
    info!("Scan engine initialized");

    let ctx = AppContext {
        engine: engine.clone(),
        db_pool,
    };

    let app = api::create_router(ctx);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    info!("Starting HTTP server on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    engine.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
