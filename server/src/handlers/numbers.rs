//! Certificate-number handler - the sequence service behind the engine's
//! `NumberSequence` trait.

use crate::db;
use crate::error::Result;
use certsync_engine::issuer::format_certificate_number;
use certsync_engine::CertificateType;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Response for a number issuance.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateNumberResponse {
    pub certificate_number: String,
}

/// Issue the next certificate number for a type. Each call claims a fresh
/// sequence value; numbers are never reused even if the caller discards one.
pub async fn handle_issue_number(
    pool: &PgPool,
    certificate_type: CertificateType,
    year: i32,
) -> Result<CertificateNumberResponse> {
    let counter = db::next_sequence_value(pool, certificate_type.as_str(), year).await?;

    let certificate_number = format_certificate_number(certificate_type, year as u16, counter as u64);
    tracing::info!(%certificate_number, "certificate number issued");

    Ok(CertificateNumberResponse { certificate_number })
}
