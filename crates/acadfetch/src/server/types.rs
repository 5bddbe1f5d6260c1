use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::records::ScrapeResult;

/// Body of `POST /attendance`. Which fields are required depends on
/// the department: the cookie-session portal needs the captcha
/// round-trip artifacts, the SPA portal only needs credentials (plus
/// a batch for timetable requests).
#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub department: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub captcha: Option<String>,
    #[serde(rename = "csrfToken")]
    pub csrf_token: Option<String>,
    pub cookies: Option<String>,
    /// `"login"` (default) or `"timetable"`.
    pub action: Option<String>,
    pub batch: Option<u8>,
}

/// Body of `POST /internalmarks`.
#[derive(Debug, Deserialize)]
pub struct MarksRequest {
    pub cookies: Option<String>,
    pub username: Option<String>,
}

/// Pulls a required field out of a request, rejecting the call with
/// an input error before any network or browser activity starts.
pub fn require_field(value: Option<String>, name: &str) -> Result<String, ScrapeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScrapeError::input(name)),
    }
}

/// Converts an operation result into the wire response.
///
/// Structural failures are the expected steady-state outcome when
/// the portal shuffles its markup, so they go out as HTTP 200 with
/// `success: false`; only caller mistakes (400), bad credentials
/// (401), and genuine breakage (500) use error statuses.
pub fn scrape_response<T: Serialize>(result: Result<T, ScrapeError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ScrapeResult::ok(data))).into_response(),
        Err(e) => error_response(&e),
    }
}

pub fn error_response(e: &ScrapeError) -> Response {
    let status = match e.kind() {
        "input" => StatusCode::BAD_REQUEST,
        "auth" => StatusCode::UNAUTHORIZED,
        "structural" => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ScrapeResult::<()>::err(e))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field_rejects_missing_and_blank() {
        assert!(require_field(None, "username").is_err());
        assert!(require_field(Some("   ".to_string()), "username").is_err());
        assert_eq!(
            require_field(Some("23z101".to_string()), "username").unwrap(),
            "23z101"
        );
    }

    #[test]
    fn test_fetch_request_accepts_minimal_spa_body() {
        let req: FetchRequest = serde_json::from_str(
            r#"{"department":"B","username":"u","password":"p"}"#,
        )
        .unwrap();
        assert_eq!(req.department.as_deref(), Some("B"));
        assert!(req.captcha.is_none());
        assert!(req.batch.is_none());
    }

    #[test]
    fn test_fetch_request_reads_camel_case_csrf() {
        let req: FetchRequest =
            serde_json::from_str(r#"{"csrfToken":"tok"}"#).unwrap();
        assert_eq!(req.csrf_token.as_deref(), Some("tok"));
    }
}
