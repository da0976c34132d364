//! Database operations for the reports table.

use sqlx::{PgPool, Row};

/// A stored report row from the database.
///
/// Timestamps are integer milliseconds since epoch, matching the engine's
/// wire format.
#[derive(Debug)]
pub struct StoredReport {
    pub report_id: String,
    pub certificate_type: String,
    pub data: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredReport {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredReport {
            report_id: row.try_get("report_id")?,
            certificate_type: row.try_get("certificate_type")?,
            data: row.try_get("data")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert or update a report. `created_at` is preserved on update.
pub async fn upsert_report(
    pool: &PgPool,
    report_id: &str,
    certificate_type: &str,
    data: &serde_json::Value,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO reports (report_id, certificate_type, data, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (report_id) DO UPDATE SET
            data = EXCLUDED.data,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(report_id)
    .bind(certificate_type)
    .bind(data)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a report by id.
pub async fn get_report(
    pool: &PgPool,
    report_id: &str,
) -> Result<Option<StoredReport>, sqlx::Error> {
    sqlx::query_as::<_, StoredReport>(
        r#"
        SELECT report_id, certificate_type, data, created_at, updated_at
        FROM reports
        WHERE report_id = $1
        "#,
    )
    .bind(report_id)
    .fetch_optional(pool)
    .await
}

/// Whether a report exists.
pub async fn report_exists(pool: &PgPool, report_id: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 AS one FROM reports WHERE report_id = $1")
        .bind(report_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
