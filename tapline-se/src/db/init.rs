//! Database initialization functions
//!
//! Opens the SQLite store, creates missing tables, and seeds the settings
//! table with default tuning values.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

/// Open (creating if necessary) the SQLite database at `db_path`
pub async fn connect(db_path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Opened database at {}", db_path.display());
    Ok(pool)
}

/// Create all tables the scan engine relies on, if missing
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            person_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            site_id TEXT NOT NULL,
            card_identifier TEXT NOT NULL,
            secondary_id TEXT,
            classroom_label TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            person_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            site_id TEXT NOT NULL,
            card_identifier TEXT NOT NULL,
            secondary_id TEXT,
            role_title TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only; corrections are an external workflow
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            fact_id TEXT PRIMARY KEY,
            person_id TEXT NOT NULL,
            person_type TEXT NOT NULL,
            site_id TEXT NOT NULL,
            device_id TEXT NOT NULL,
            device_label TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'present'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_attendance_person_site_time
        ON attendance (person_id, site_id, recorded_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            device_id TEXT PRIMARY KEY,
            site_id TEXT NOT NULL,
            label TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize settings table with default values
pub async fn init_settings_defaults(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Initializing default settings");

    // Settings with their default values
    let defaults = vec![
        // Normalizer framing
        ("min_identifier_len", "4"),
        ("identifier_frame_width", "10"),
        ("keystroke_gap_ms", "500"),
        // Debounce and duplicate suppression
        ("dedup_window_ms", "3000"),
        // Roster warm-up wait
        ("roster_wait_timeout_ms", "3000"),
        ("roster_poll_interval_ms", "100"),
        ("roster_refresh_interval_s", "30"),
        // Operator notices
        ("notice_success_ttl_ms", "3000"),
        ("notice_failure_ttl_ms", "5000"),
    ];

    for (key, default_value) in defaults {
        // Check if setting exists
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
                .bind(key)
                .fetch_one(pool)
                .await?;

        if !exists {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;

            info!(
                "Initialized setting '{}' with default value: {}",
                key, default_value
            );
        }
    }

    Ok(())
}
