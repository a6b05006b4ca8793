//! HTTP request handlers
//!
//! Implements REST API endpoints for scan injection, attendance queries,
//! and operator notices.

use crate::api::server::AppContext;
use crate::db;
use crate::db::attendance::AttendanceFact;
use crate::notice::Notice;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyScanRequest {
    pub site_id: String,
    pub device_id: String,
    /// One key event: a character, "Enter", or a named modifier key
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct NfcScanRequest {
    pub site_id: String,
    pub device_id: String,
    pub uid: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentAttendanceQuery {
    pub site_id: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub facts: Vec<AttendanceFact>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct NoticesQuery {
    pub site_id: String,
}

#[derive(Debug, Serialize)]
pub struct NoticesResponse {
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
pub struct TuningResponse {
    pub min_identifier_len: usize,
    pub identifier_frame_width: usize,
    pub keystroke_gap_ms: u64,
    pub dedup_window_ms: u64,
    pub roster_wait_timeout_ms: u64,
    pub roster_poll_interval_ms: u64,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "scan_engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Scan Injection Endpoints
// ============================================================================

/// POST /scan/key - One HID key event from a kiosk front-end
///
/// Accepted unconditionally; framing, debounce, and resolution happen
/// asynchronously in the reader-stream session so the kiosk is never
/// blocked on a store write.
pub async fn scan_key(
    State(ctx): State<AppContext>,
    Json(req): Json<KeyScanRequest>,
) -> StatusCode {
    ctx.engine
        .ingest_key(&req.site_id, &req.device_id, &req.key)
        .await;
    StatusCode::ACCEPTED
}

/// POST /scan/nfc - One decoded NFC payload
pub async fn scan_nfc(
    State(ctx): State<AppContext>,
    Json(req): Json<NfcScanRequest>,
) -> StatusCode {
    ctx.engine
        .ingest_nfc(&req.site_id, &req.device_id, &req.uid)
        .await;
    StatusCode::ACCEPTED
}

/// GET /scan/tuning - Effective scan tuning values
pub async fn get_tuning(State(ctx): State<AppContext>) -> Json<TuningResponse> {
    let tuning = ctx.engine.tuning();
    Json(TuningResponse {
        min_identifier_len: tuning.min_identifier_len,
        identifier_frame_width: tuning.identifier_frame_width,
        keystroke_gap_ms: tuning.keystroke_gap.as_millis() as u64,
        dedup_window_ms: tuning.dedup_window.as_millis() as u64,
        roster_wait_timeout_ms: tuning.roster_wait_timeout.as_millis() as u64,
        roster_poll_interval_ms: tuning.roster_poll_interval.as_millis() as u64,
    })
}

// ============================================================================
// Attendance Endpoints
// ============================================================================

/// GET /attendance/recent - Recent facts for a site, newest first
///
/// The re-query surface behind the SSE invalidation events: dashboards and
/// the TV board call this after each event instead of trusting the event
/// payload.
pub async fn recent_attendance(
    State(ctx): State<AppContext>,
    Query(query): Query<RecentAttendanceQuery>,
) -> Result<Json<AttendanceListResponse>, (StatusCode, Json<StatusResponse>)> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    match db::attendance::recent_for_site(&ctx.db_pool, &query.site_id, limit).await {
        Ok(facts) => {
            let count = facts.len();
            Ok(Json(AttendanceListResponse { facts, count }))
        }
        Err(e) => {
            error!("Failed to load recent attendance: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {}", e),
                }),
            ))
        }
    }
}

// ============================================================================
// Notice Endpoints
// ============================================================================

/// GET /notices - Active operator notices for a site
pub async fn get_notices(
    State(ctx): State<AppContext>,
    Query(query): Query<NoticesQuery>,
) -> Json<NoticesResponse> {
    Json(NoticesResponse {
        notices: ctx.engine.notices().active(&query.site_id),
    })
}
