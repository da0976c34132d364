//! Report and certificate-number routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{
    handle_get_report, handle_issue_number, handle_upsert_report, CertificateNumberResponse,
    ReportResponse, UpsertReportRequest, UpsertReportResponse,
};
use crate::AppState;
use certsync_engine::CertificateType;

/// Create report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", post(upsert_report))
        .route("/reports/{id}", get(get_report))
        .route("/certificate-numbers/{certificate_type}", post(issue_number))
}

/// POST /reports - create or update a report.
async fn upsert_report(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<UpsertReportRequest>,
) -> Result<Json<UpsertReportResponse>> {
    let now = Utc::now().timestamp_millis();
    let response = handle_upsert_report(&state.pool, request, now).await?;
    Ok(Json(response))
}

/// GET /reports/{id} - fetch a report.
async fn get_report(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>> {
    let response = handle_get_report(&state.pool, &id).await?;
    Ok(Json(response))
}

/// POST /certificate-numbers/{certificate_type} - claim the next number.
async fn issue_number(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(certificate_type): Path<String>,
) -> Result<Json<CertificateNumberResponse>> {
    let certificate_type: CertificateType = certificate_type
        .parse()
        .map_err(AppError::BadRequest)?;
    let year = Utc::now().year();
    let response = handle_issue_number(&state.pool, certificate_type, year).await?;
    Ok(Json(response))
}
