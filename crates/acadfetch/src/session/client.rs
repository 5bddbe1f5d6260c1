//! Session-based HTTP client for the cookie-session portal.
//!
//! The login handshake:
//! 1. GET the login page, scrape the CSRF token from its hidden field
//! 2. GET the captcha image on the same cookie jar, hand it to the
//!    caller base64-encoded
//! 3. caller solves the captcha and resubmits; we restore their
//!    cookie string into a fresh jar and POST the login form
//! 4. on success, GET the attendance report and parse it
//!
//! The portal's form is inconsistently named: username, password,
//! captcha and CSRF token are each submitted under two field names.
//! Both aliases are populated until the live form is verified to
//! need only one.

use crate::error::ScrapeError;
use crate::extract;
use crate::records::{AttendanceRecord, SessionArtifacts, SubjectMarks};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, CONTENT_TYPE, USER_AGENT};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

static CSRF_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name=\"csrf_token\"]").unwrap());
static HIDDEN_INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type=\"hidden\"]").unwrap());

/// Body phrases the portal prints on a rejected login. Checked
/// case-insensitively before any structural parsing.
const AUTH_FAILURE_PHRASES: [&str; 2] = ["invalid credentials", "invalid captcha"];

/// Configuration for the session-based portal client.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Portal origin, e.g. `https://ecampus.example.edu`.
    pub base_url: String,
    pub login_path: String,
    pub captcha_path: String,
    pub attendance_path: String,
    pub marks_path: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ecampus.psgtech.ac.in".to_string(),
            login_path: "/studzone2/".to_string(),
            captcha_path: "/studzone2/CaptchaImage.axd".to_string(),
            attendance_path: "/studzone2/AttWfPercView.aspx".to_string(),
            marks_path: "/studzone2/CAMarksView.aspx".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the cookie-session portal. One instance per inbound
/// request; nothing is shared or reused across calls.
pub struct SessionClient {
    config: SessionConfig,
}

impl SessionClient {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    fn build_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            self.config
                .user_agent
                .parse()
                .map_err(|_| ScrapeError::infra("invalid user-agent header"))?,
        );
        reqwest::Client::builder()
            .cookie_provider(jar)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| ScrapeError::infra(format!("failed to build HTTP client: {e}")))
    }

    fn url(&self, path: &str) -> Result<Url, ScrapeError> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?)
    }

    /// Loads the login page and captcha image on one cookie jar.
    /// Returns everything the caller needs to attempt a login: the
    /// CSRF token, the accumulated cookies, and the captcha image as
    /// a data URL for display.
    pub async fn init_session(&self) -> Result<SessionArtifacts, ScrapeError> {
        let jar = Arc::new(Jar::default());
        let client = self.build_client(jar.clone())?;
        let login_url = self.url(&self.config.login_path)?;

        info!(url = %login_url, "loading login page");
        let body = client.get(login_url.clone()).send().await?.text().await?;
        let csrf_token = parse_csrf_token(&body).ok_or_else(|| {
            ScrapeError::structural("CSRF token not found on login page")
        })?;

        let captcha_url = self.url(&self.config.captcha_path)?;
        debug!(url = %captcha_url, "fetching captcha image");
        let response = client.get(captcha_url).send().await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let image_bytes = response.bytes().await?;
        if image_bytes.is_empty() {
            return Err(ScrapeError::structural("captcha endpoint returned no image"));
        }

        let cookie_header = jar
            .cookies(&login_url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();

        info!(cookies = cookie_header.split(';').count(), "session initialized");
        Ok(SessionArtifacts {
            csrf_token,
            cookie_header,
            captcha_image: format!("data:{};base64,{}", content_type, BASE64.encode(&image_bytes)),
        })
    }

    /// Submits the login form with the caller-solved captcha, then
    /// fetches and parses the attendance report.
    pub async fn login_and_fetch_attendance(
        &self,
        username: &str,
        password: &str,
        captcha: &str,
        csrf_token: &str,
        cookie_header: &str,
    ) -> Result<Vec<AttendanceRecord>, ScrapeError> {
        let jar = Arc::new(Jar::default());
        let login_url = self.url(&self.config.login_path)?;
        restore_cookies(&jar, cookie_header, &login_url);
        let client = self.build_client(jar)?;

        // Every value goes out under both of its field names; the
        // live form has never been confirmed to read only one.
        let form = [
            ("txtAN", username),
            ("login", username),
            ("txtSK", password),
            ("passwd", password),
            ("txtcaptcha", captcha),
            ("captcha", captcha),
            ("hdnCSRF", csrf_token),
            ("csrf_token", csrf_token),
        ];

        info!(username, "submitting login form");
        let response = client.post(login_url).form(&form).send().await?;
        let body = response.text().await?;
        check_auth_failure(&body)?;

        let attendance_url = self.url(&self.config.attendance_path)?;
        debug!(url = %attendance_url, "fetching attendance report");
        let report = client.get(attendance_url).send().await?.text().await?;

        let records = extract::extract_attendance(&report)?;
        info!(subjects = records.len(), "attendance extracted");
        Ok(records)
    }

    /// Fetches internal marks on an already-authenticated cookie
    /// header, without re-running the login handshake. Subject names
    /// are enriched from the attendance view when it is reachable.
    pub async fn fetch_internal_marks(
        &self,
        cookie_header: &str,
        username: &str,
    ) -> Result<Vec<SubjectMarks>, ScrapeError> {
        let jar = Arc::new(Jar::default());
        let marks_url = self.url(&self.config.marks_path)?;
        restore_cookies(&jar, cookie_header, &marks_url);
        let client = self.build_client(jar)?;

        info!(username, "fetching internal marks");
        let body = client.get(marks_url).send().await?.text().await?;
        if looks_like_login_page(&body) {
            return Err(ScrapeError::auth("session cookies are stale or invalid"));
        }

        let mut marks = extract::extract_marks(&body)?;

        // The marks report prints codes only; borrow names from the
        // attendance view. Best-effort; a failure here never fails
        // the marks call.
        let attendance_url = self.url(&self.config.attendance_path)?;
        match client.get(attendance_url).send().await {
            Ok(response) => match response.text().await {
                Ok(report) => {
                    if let Ok(attendance) = extract::extract_attendance(&report) {
                        extract::enrich_marks_with_attendance(&mut marks, &attendance);
                    }
                }
                Err(e) => warn!(error = %e, "attendance body unreadable, names not enriched"),
            },
            Err(e) => warn!(error = %e, "attendance fetch failed, names not enriched"),
        }

        info!(subjects = marks.len(), "marks extracted");
        Ok(marks)
    }
}

/// Scrapes the CSRF token from the login form. The canonical field
/// is `csrf_token`; some portal revisions rename it, so any hidden
/// input whose name mentions "csrf" is accepted as a fallback.
fn parse_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(input) = document.select(&CSRF_SELECTOR).next() {
        if let Some(value) = input.value().attr("value") {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    document
        .select(&HIDDEN_INPUT_SELECTOR)
        .filter(|input| {
            input
                .value()
                .attr("name")
                .is_some_and(|name| name.to_lowercase().contains("csrf"))
        })
        .find_map(|input| {
            input
                .value()
                .attr("value")
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

/// Restores an opaque `;`-joined cookie string into a jar. Pairs
/// that do not look like `key=value` are skipped.
fn restore_cookies(jar: &Jar, cookie_header: &str, url: &Url) {
    for pair in cookie_header.split(';') {
        let pair = pair.trim();
        if pair.contains('=') {
            jar.add_cookie_str(pair, url);
        }
    }
}

fn check_auth_failure(body: &str) -> Result<(), ScrapeError> {
    let lower = body.to_lowercase();
    for phrase in AUTH_FAILURE_PHRASES {
        if lower.contains(phrase) {
            return Err(ScrapeError::auth(phrase));
        }
    }
    Ok(())
}

/// A report request that bounced back to the login form means the
/// session has expired server-side.
fn looks_like_login_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("type=\"password\"")
        || (lower.contains("captcha") && lower.contains("login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_from_canonical_field() {
        let html = r#"<form><input type="hidden" name="csrf_token" value="tok123"></form>"#;
        assert_eq!(parse_csrf_token(html), Some("tok123".to_string()));
    }

    #[test]
    fn test_csrf_fallback_hidden_field() {
        let html = r#"<form><input type="hidden" name="hdnCSRFGuard" value="tok456"></form>"#;
        assert_eq!(parse_csrf_token(html), Some("tok456".to_string()));
    }

    #[test]
    fn test_csrf_absent() {
        assert_eq!(parse_csrf_token("<form></form>"), None);
    }

    #[test]
    fn test_auth_phrase_detection() {
        assert!(check_auth_failure("<b>Invalid Captcha</b> try again").is_err());
        assert!(check_auth_failure("<b>Invalid Credentials</b>").is_err());
        assert!(check_auth_failure("<table>report</table>").is_ok());
    }

    #[test]
    fn test_login_page_detection() {
        assert!(looks_like_login_page(
            r#"<input type="password" name="txtSK">"#
        ));
        assert!(!looks_like_login_page("<table><tr><td>21CSC101T</td></tr></table>"));
    }
}
