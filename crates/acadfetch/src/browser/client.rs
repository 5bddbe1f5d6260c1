use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::browser::assist::AssistConfig;
use crate::browser::{extract, login, session::BrowserSession};
use crate::error::ScrapeError;
use crate::records::{AttendanceRecord, TimetableCell};

/// Selectors, deep links, and timing budgets for the SPA portal.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub base_url: String,
    /// Appended to `base_url` to reach the attendance report.
    pub attendance_fragment: String,
    /// Appended to `base_url`; `{batch}` is replaced by the batch
    /// number before navigation.
    pub timetable_fragment: String,
    pub username_selector: String,
    pub password_selector: String,
    /// "Next" control in two-screen username/password flows.
    pub next_selector: String,
    pub submit_selector: String,
    /// URL substrings that only appear once the student dashboard is
    /// reached.
    pub authenticated_markers: Vec<String>,
    pub headless: bool,
    pub login_form_timeout: Duration,
    pub post_login_timeout: Duration,
    pub content_timeout: Duration,
    pub nav_timeout: Duration,
    pub poll_interval: Duration,
    pub assist: AssistConfig,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://academia.srmist.edu.in".to_string(),
            attendance_fragment: "/#Page:My_Attendance".to_string(),
            timetable_fragment: "/#Page:Unified_Time_Table_2025_Batch_{batch}".to_string(),
            username_selector: "input[name=\"login_id\"], #login_id, input[type=\"email\"]"
                .to_string(),
            password_selector: "input[name=\"PASSWORD\"], #password, input[type=\"password\"]"
                .to_string(),
            next_selector: "#nextbtn, button.nextbtn".to_string(),
            submit_selector: "#nextbtn, #signinbtn, button[type=\"submit\"]".to_string(),
            authenticated_markers: vec!["/portal/".to_string(), "#Page:".to_string()],
            headless: true,
            login_form_timeout: Duration::from_secs(25),
            post_login_timeout: Duration::from_secs(20),
            content_timeout: Duration::from_secs(30),
            nav_timeout: Duration::from_secs(45),
            poll_interval: Duration::from_millis(500),
            assist: AssistConfig::default(),
        }
    }
}

impl AutomationConfig {
    pub fn attendance_url(&self) -> String {
        format!("{}{}", self.base_url, self.attendance_fragment)
    }

    pub fn timetable_url(&self, batch: u8) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.timetable_fragment.replace("{batch}", &batch.to_string())
        )
    }
}

/// Client for the SPA portal, driven through a real browser because
/// the portal has no stable HTTP API and renders everything behind
/// JavaScript and nested iframes.
///
/// Each call launches a fresh browser, runs the full login and
/// extraction flow, and tears the browser down again, whatever the
/// outcome.
pub struct PortalClient {
    config: AutomationConfig,
}

impl PortalClient {
    pub fn new(config: AutomationConfig) -> Self {
        Self { config }
    }

    /// Logs in and scrapes the attendance report.
    #[instrument(skip(self, password))]
    pub async fn login_and_fetch_attendance(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<AttendanceRecord>, ScrapeError> {
        let session = self.launch().await?;
        let result = async {
            login::perform_login(session.page(), &self.config, username, password).await?;
            extract::fetch_attendance(&session, &self.config).await
        }
        .await;
        session.close().await;
        if let Err(ref e) = result {
            warn!(error = %e, "attendance flow failed");
        }
        result
    }

    /// Logs in and builds the student's weekly timetable for the
    /// given batch.
    #[instrument(skip(self, password))]
    pub async fn login_and_fetch_timetable(
        &self,
        username: &str,
        password: &str,
        batch: u8,
    ) -> Result<Vec<TimetableCell>, ScrapeError> {
        let session = self.launch().await?;
        let result = async {
            login::perform_login(session.page(), &self.config, username, password).await?;
            extract::fetch_timetable(session.page(), &self.config, batch).await
        }
        .await;
        session.close().await;
        if let Err(ref e) = result {
            warn!(error = %e, batch, "timetable flow failed");
        }
        result
    }

    async fn launch(&self) -> Result<BrowserSession, ScrapeError> {
        info!(headless = self.config.headless, "starting browser flow");
        BrowserSession::launch(self.config.headless, self.config.nav_timeout).await
    }
}
