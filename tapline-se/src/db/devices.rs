//! Device registry queries

use crate::error::Result;
use sqlx::{Pool, Sqlite};

/// Register or relabel a reader device
pub async fn register_device(
    db: &Pool<Sqlite>,
    device_id: &str,
    site_id: &str,
    label: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO devices (device_id, site_id, label)
        VALUES (?, ?, ?)
        ON CONFLICT(device_id) DO UPDATE SET site_id = excluded.site_id, label = excluded.label
        "#,
    )
    .bind(device_id)
    .bind(site_id)
    .bind(label)
    .execute(db)
    .await?;

    Ok(())
}

/// Human-readable label for a device, if registered
pub async fn get_device_label(db: &Pool<Sqlite>, device_id: &str) -> Result<Option<String>> {
    let label: Option<String> = sqlx::query_scalar("SELECT label FROM devices WHERE device_id = ?")
        .bind(device_id)
        .fetch_optional(db)
        .await?;

    Ok(label)
}
