//! Endpoints that drive the two portal clients.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info};

use crate::error::ScrapeError;
use crate::server::types::{error_response, require_field, scrape_response, FetchRequest, MarksRequest};
use crate::types::AppState;

/// GET /captcha
///
/// Starts a fresh session against the cookie-session portal and
/// hands back the artifacts the caller needs to present the captcha
/// and complete the login: the image as a data URL, the CSRF token,
/// and the cookie string to echo back.
pub async fn get_captcha(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /captcha");
    match s.session_client().init_session().await {
        Ok(artifacts) => (
            StatusCode::OK,
            Json(json!({
                "img": artifacts.captcha_image,
                "csrf": artifacts.csrf_token,
                "cookie": artifacts.cookie_header,
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "session init failed");
            // An unreachable portal is upstream's fault, not ours.
            if e.kind() == "infra" {
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(crate::records::ScrapeResult::<()>::err(&e)),
                )
                    .into_response();
            }
            error_response(&e)
        }
    }
}

/// POST /attendance
///
/// Department "A" runs the cookie-session login with the caller's
/// captcha solution. Department "B" drives the browser client, and
/// `action: "timetable"` switches it from attendance to the joined
/// weekly timetable.
pub async fn post_attendance(
    State(s): State<Arc<AppState>>,
    Json(req): Json<FetchRequest>,
) -> Response {
    let department = req.department.clone().unwrap_or_default();
    let action = req.action.clone().unwrap_or_else(|| "login".to_string());
    info!(%department, %action, "POST /attendance");

    match (department.as_str(), action.as_str()) {
        ("A", "login") => {
            let result = session_attendance(&s, req).await;
            scrape_response(result)
        }
        ("B", "login") => {
            let result = browser_attendance(&s, req).await;
            scrape_response(result)
        }
        ("B", "timetable") => {
            let result = browser_timetable(&s, req).await;
            scrape_response(result)
        }
        ("A", _) => error_response(&ScrapeError::input("action")),
        _ => error_response(&ScrapeError::input("department")),
    }
}

async fn session_attendance(
    s: &Arc<AppState>,
    req: FetchRequest,
) -> Result<Vec<crate::records::AttendanceRecord>, ScrapeError> {
    let username = require_field(req.username, "username")?;
    let password = require_field(req.password, "password")?;
    let captcha = require_field(req.captcha, "captcha")?;
    let csrf_token = require_field(req.csrf_token, "csrfToken")?;
    let cookies = require_field(req.cookies, "cookies")?;

    s.session_client()
        .login_and_fetch_attendance(&username, &password, &captcha, &csrf_token, &cookies)
        .await
}

async fn browser_attendance(
    s: &Arc<AppState>,
    req: FetchRequest,
) -> Result<Vec<crate::records::AttendanceRecord>, ScrapeError> {
    let username = require_field(req.username, "username")?;
    let password = require_field(req.password, "password")?;

    s.portal_client()
        .login_and_fetch_attendance(&username, &password)
        .await
}

async fn browser_timetable(
    s: &Arc<AppState>,
    req: FetchRequest,
) -> Result<Vec<crate::records::TimetableCell>, ScrapeError> {
    let username = require_field(req.username, "username")?;
    let password = require_field(req.password, "password")?;
    let batch = req.batch.ok_or_else(|| ScrapeError::input("batch"))?;

    s.portal_client()
        .login_and_fetch_timetable(&username, &password, batch)
        .await
}

/// POST /internalmarks
///
/// Reuses an already-authenticated cookie header; stale cookies come
/// back as 401 so the caller knows to redo the captcha round-trip.
pub async fn post_internalmarks(
    State(s): State<Arc<AppState>>,
    Json(req): Json<MarksRequest>,
) -> Response {
    info!("POST /internalmarks");
    let result = async {
        let cookies = require_field(req.cookies, "cookies")?;
        let username = require_field(req.username, "username")?;
        s.session_client()
            .fetch_internal_marks(&cookies, &username)
            .await
    }
    .await;
    scrape_response(result)
}
