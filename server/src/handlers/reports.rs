//! Report handlers - get and upsert the stored form snapshots.

use crate::db;
use crate::error::{AppError, Result};
use certsync_engine::{CertificateType, FormSnapshot};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Request body for a report upsert.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReportRequest {
    /// Absent for a create; the server assigns the id.
    pub report_id: Option<String>,
    pub certificate_type: CertificateType,
    /// The full form snapshot. Must be a JSON object.
    pub data: serde_json::Value,
}

/// Response for a report upsert.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReportResponse {
    pub report_id: String,
    /// Server-side modification time, milliseconds since epoch.
    pub updated_at: i64,
}

/// Response for a report fetch.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report_id: String,
    pub certificate_type: String,
    pub data: serde_json::Value,
    pub updated_at: i64,
}

/// Process a report upsert. Creates with a fresh uuid when no id is given;
/// updating an unknown id is a 404, never an implicit create.
pub async fn handle_upsert_report(
    pool: &PgPool,
    request: UpsertReportRequest,
    now: i64,
) -> Result<UpsertReportResponse> {
    // Validate the payload shape the same way the engine does.
    let snapshot = FormSnapshot::from_value(request.data)?;
    let data = serde_json::to_value(&snapshot)
        .map_err(|e| AppError::BadRequest(format!("unserializable payload: {e}")))?;

    let report_id = match request.report_id {
        Some(id) => {
            if !db::report_exists(pool, &id).await? {
                return Err(AppError::NotFound(format!("report not found: {id}")));
            }
            id
        }
        None => Uuid::new_v4().to_string(),
    };

    db::upsert_report(
        pool,
        &report_id,
        request.certificate_type.as_str(),
        &data,
        now,
    )
    .await?;

    tracing::debug!(report_id = %report_id, certificate_type = %request.certificate_type, "report upserted");

    Ok(UpsertReportResponse {
        report_id,
        updated_at: now,
    })
}

/// Fetch a report by id.
pub async fn handle_get_report(pool: &PgPool, report_id: &str) -> Result<ReportResponse> {
    let stored = db::get_report(pool, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("report not found: {report_id}")))?;

    Ok(ReportResponse {
        report_id: stored.report_id,
        certificate_type: stored.certificate_type,
        data: stored.data,
        updated_at: stored.updated_at,
    })
}
