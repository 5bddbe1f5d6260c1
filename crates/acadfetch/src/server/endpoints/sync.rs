//! POST /sync: ingestion point for records captured outside the
//! scraper, typically by a bookmarklet running in the student's own
//! browser session. The route is CORS-open because the caller is a
//! third-party page context by design.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ScrapeError;
use crate::records::{AttendanceRecord, SubjectMarks, TimetableCell};
use crate::server::types::error_response;

#[derive(Debug, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub attendance: Option<Vec<AttendanceRecord>>,
    #[serde(default)]
    pub marks: Option<Vec<SubjectMarks>>,
    #[serde(default)]
    pub timetable: Option<Vec<TimetableCell>>,
}

/// Acknowledges externally captured records. Nothing is persisted
/// here; the caller keeps its own storage and only needs a receipt
/// that the shapes parsed.
pub async fn post_sync(Json(payload): Json<SyncPayload>) -> Response {
    let attendance = payload.attendance.as_ref().map_or(0, Vec::len);
    let marks = payload.marks.as_ref().map_or(0, Vec::len);
    let timetable = payload.timetable.as_ref().map_or(0, Vec::len);
    let received = attendance + marks + timetable;
    info!(attendance, marks, timetable, "POST /sync");

    if payload.attendance.is_none() && payload.marks.is_none() && payload.timetable.is_none() {
        return error_response(&ScrapeError::input(
            "attendance, marks, or timetable",
        ));
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "received": received,
        })),
    )
        .into_response()
}
