//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).
//! All settings are global/system-wide. The scan tuning values are
//! database-first: read at startup, defaults written back when missing.

use crate::config::ScanTuning;
use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

/// Load the full scan tuning block from the settings table
///
/// Missing keys fall back to (and are written back as) the compiled
/// defaults, so a fresh database ends up fully populated.
pub async fn load_scan_tuning(db: &Pool<Sqlite>) -> Result<ScanTuning> {
    let defaults = ScanTuning::default();

    let min_identifier_len = get_or_init(db, "min_identifier_len", defaults.min_identifier_len as u64)
        .await? as usize;
    let identifier_frame_width =
        get_or_init(db, "identifier_frame_width", defaults.identifier_frame_width as u64).await?
            as usize;
    let keystroke_gap_ms =
        get_or_init(db, "keystroke_gap_ms", defaults.keystroke_gap.as_millis() as u64).await?;
    let dedup_window_ms =
        get_or_init(db, "dedup_window_ms", defaults.dedup_window.as_millis() as u64).await?;
    let roster_wait_timeout_ms = get_or_init(
        db,
        "roster_wait_timeout_ms",
        defaults.roster_wait_timeout.as_millis() as u64,
    )
    .await?;
    let roster_poll_interval_ms = get_or_init(
        db,
        "roster_poll_interval_ms",
        defaults.roster_poll_interval.as_millis() as u64,
    )
    .await?;
    let roster_refresh_interval_s = get_or_init(
        db,
        "roster_refresh_interval_s",
        defaults.roster_refresh_interval.as_secs(),
    )
    .await?;
    let notice_success_ttl_ms = get_or_init(
        db,
        "notice_success_ttl_ms",
        defaults.notice_success_ttl.as_millis() as u64,
    )
    .await?;
    let notice_failure_ttl_ms = get_or_init(
        db,
        "notice_failure_ttl_ms",
        defaults.notice_failure_ttl.as_millis() as u64,
    )
    .await?;

    Ok(ScanTuning {
        min_identifier_len,
        identifier_frame_width,
        keystroke_gap: Duration::from_millis(keystroke_gap_ms),
        dedup_window: Duration::from_millis(dedup_window_ms),
        roster_wait_timeout: Duration::from_millis(roster_wait_timeout_ms),
        roster_poll_interval: Duration::from_millis(roster_poll_interval_ms),
        roster_refresh_interval: Duration::from_secs(roster_refresh_interval_s),
        notice_success_ttl: Duration::from_millis(notice_success_ttl_ms),
        notice_failure_ttl: Duration::from_millis(notice_failure_ttl_ms),
    })
}

/// Read a numeric setting, writing the default back when the key is missing
async fn get_or_init(db: &Pool<Sqlite>, key: &str, default: u64) -> Result<u64> {
    match get_setting::<u64>(db, key).await? {
        Some(value) => Ok(value),
        None => {
            set_setting(db, key, default).await?;
            Ok(default)
        }
    }
}

/// Generic setting getter
///
/// Returns None if key doesn't exist in database.
/// Parses value from string using FromStr trait.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    let value_str = value.to_string();

    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value_str)
    .execute(db)
    .await?;

    Ok(())
}
