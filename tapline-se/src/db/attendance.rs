//! Attendance fact persistence
//!
//! The attendance table is append-only from the engine's point of view:
//! facts are inserted once per accepted tap and never updated or deleted
//! here. The latest-fact query backs the authoritative duplicate check.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tapline_common::person::PersonType;

/// A persisted attendance fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceFact {
    pub fact_id: String,
    pub person_id: String,
    pub person_type: PersonType,
    pub site_id: String,
    pub device_id: String,
    pub device_label: String,
    pub recorded_at: DateTime<Utc>,
    pub status: String,
}

/// Insert a new attendance fact
pub async fn insert_fact(db: &Pool<Sqlite>, fact: &AttendanceFact) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance
            (fact_id, person_id, person_type, site_id, device_id, device_label, recorded_at, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fact.fact_id)
    .bind(&fact.person_id)
    .bind(fact.person_type.to_string())
    .bind(&fact.site_id)
    .bind(&fact.device_id)
    .bind(&fact.device_label)
    .bind(fact.recorded_at.to_rfc3339())
    .bind(&fact.status)
    .execute(db)
    .await?;

    Ok(())
}

/// Most recent recorded_at for a person at a site, if any
///
/// RFC 3339 strings sort lexicographically in timestamp order, so MAX over
/// the text column is the latest fact.
pub async fn latest_recorded_at(
    db: &Pool<Sqlite>,
    person_id: &str,
    site_id: &str,
) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = sqlx::query_scalar(
        r#"
        SELECT MAX(recorded_at) FROM attendance
        WHERE person_id = ? AND site_id = ?
        "#,
    )
    .bind(person_id)
    .bind(site_id)
    .fetch_one(db)
    .await?;

    match value {
        Some(raw) => {
            let parsed = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| Error::Internal(format!("Bad recorded_at in attendance: {}", e)))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

/// Most recent facts for a site, newest first
///
/// This is the re-query surface behind the SSE invalidation events.
pub async fn recent_for_site(
    db: &Pool<Sqlite>,
    site_id: &str,
    limit: i64,
) -> Result<Vec<AttendanceFact>> {
    let rows = sqlx::query_as::<_, (String, String, String, String, String, String, String, String)>(
        r#"
        SELECT fact_id, person_id, person_type, site_id, device_id, device_label, recorded_at, status
        FROM attendance
        WHERE site_id = ?
        ORDER BY recorded_at DESC
        LIMIT ?
        "#,
    )
    .bind(site_id)
    .bind(limit)
    .fetch_all(db)
    .await?;

    let mut facts = Vec::with_capacity(rows.len());
    for row in rows {
        let person_type = row
            .2
            .parse::<PersonType>()
            .map_err(|e| Error::Internal(format!("Bad person_type in attendance: {}", e)))?;
        let recorded_at = DateTime::parse_from_rfc3339(&row.6)
            .map_err(|e| Error::Internal(format!("Bad recorded_at in attendance: {}", e)))?
            .with_timezone(&Utc);

        facts.push(AttendanceFact {
            fact_id: row.0,
            person_id: row.1,
            person_type,
            site_id: row.3,
            device_id: row.4,
            device_label: row.5,
            recorded_at,
            status: row.7,
        });
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init::init_schema(&pool).await.unwrap();
        pool
    }

    fn fact_at(ts: DateTime<Utc>, fact_id: &str) -> AttendanceFact {
        AttendanceFact {
            fact_id: fact_id.to_string(),
            person_id: "stu-1".to_string(),
            person_type: PersonType::Student,
            site_id: "site-a".to_string(),
            device_id: "front-desk-1".to_string(),
            device_label: "Front Desk".to_string(),
            recorded_at: ts,
            status: "present".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_latest_roundtrip() {
        let db = setup_test_db().await;
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 5).unwrap();

        assert!(latest_recorded_at(&db, "stu-1", "site-a").await.unwrap().is_none());

        insert_fact(&db, &fact_at(t0, "f-1")).await.unwrap();
        insert_fact(&db, &fact_at(t1, "f-2")).await.unwrap();

        let latest = latest_recorded_at(&db, "stu-1", "site-a").await.unwrap();
        assert_eq!(latest, Some(t1));

        // Scoped per site: other site sees nothing
        assert!(latest_recorded_at(&db, "stu-1", "site-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_for_site_orders_newest_first() {
        let db = setup_test_db().await;
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 1, 0).unwrap();

        insert_fact(&db, &fact_at(t0, "f-1")).await.unwrap();
        insert_fact(&db, &fact_at(t1, "f-2")).await.unwrap();

        let facts = recent_for_site(&db, "site-a", 10).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].fact_id, "f-2");
        assert_eq!(facts[1].fact_id, "f-1");
        assert_eq!(facts[0].person_type, PersonType::Student);

        let limited = recent_for_site(&db, "site-a", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
