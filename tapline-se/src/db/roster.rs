//! Roster projection queries
//!
//! Read-only access to the students and staff tables. The engine only reads
//! these rows; roster maintenance (imports, approvals) happens elsewhere.

use crate::error::Result;
use sqlx::{Pool, Sqlite};
use tapline_common::person::{StaffRecord, StudentRecord};

/// Load the student roster for one site
pub async fn load_students(db: &Pool<Sqlite>, site_id: &str) -> Result<Vec<StudentRecord>> {
    let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, Option<String>)>(
        r#"
        SELECT person_id, display_name, site_id, card_identifier, secondary_id, classroom_label
        FROM students
        WHERE site_id = ?
        ORDER BY display_name ASC
        "#,
    )
    .bind(site_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StudentRecord {
            person_id: row.0,
            display_name: row.1,
            site_id: row.2,
            card_identifier: row.3,
            secondary_id: row.4,
            classroom_label: row.5,
        })
        .collect())
}

/// Load the staff roster for one site
pub async fn load_staff(db: &Pool<Sqlite>, site_id: &str) -> Result<Vec<StaffRecord>> {
    let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, Option<String>)>(
        r#"
        SELECT person_id, display_name, site_id, card_identifier, secondary_id, role_title
        FROM staff
        WHERE site_id = ?
        ORDER BY display_name ASC
        "#,
    )
    .bind(site_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StaffRecord {
            person_id: row.0,
            display_name: row.1,
            site_id: row.2,
            card_identifier: row.3,
            secondary_id: row.4,
            role_title: row.5,
        })
        .collect())
}

/// Distinct site ids present in either roster table
pub async fn list_site_ids(db: &Pool<Sqlite>) -> Result<Vec<String>> {
    let sites: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT site_id FROM students
        UNION
        SELECT site_id FROM staff
        ORDER BY site_id ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init::init_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_student(db: &Pool<Sqlite>, person_id: &str, site_id: &str, card: &str) {
        sqlx::query(
            "INSERT INTO students (person_id, display_name, site_id, card_identifier, secondary_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(person_id)
        .bind(format!("Student {}", person_id))
        .bind(site_id)
        .bind(card)
        .bind(Option::<String>::None)
        .execute(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_students_scoped_by_site() {
        let db = setup_test_db().await;
        seed_student(&db, "stu-1", "site-a", "3680715012").await;
        seed_student(&db, "stu-2", "site-b", "1111111111").await;

        let site_a = load_students(&db, "site-a").await.unwrap();
        assert_eq!(site_a.len(), 1);
        assert_eq!(site_a[0].person_id, "stu-1");
        assert_eq!(site_a[0].card_identifier, "3680715012");

        let site_c = load_students(&db, "site-c").await.unwrap();
        assert!(site_c.is_empty());
    }

    #[tokio::test]
    async fn test_list_site_ids_union() {
        let db = setup_test_db().await;
        seed_student(&db, "stu-1", "site-a", "1").await;
        sqlx::query(
            "INSERT INTO staff (person_id, display_name, site_id, card_identifier) VALUES (?, ?, ?, ?)",
        )
        .bind("stf-1")
        .bind("Staff One")
        .bind("site-b")
        .bind("2")
        .execute(&db)
        .await
        .unwrap();

        let sites = list_site_ids(&db).await.unwrap();
        assert_eq!(sites, vec!["site-a".to_string(), "site-b".to_string()]);
    }
}
