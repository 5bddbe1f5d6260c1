use chromiumoxide::Page;
use tracing::{debug, info};

use crate::browser::assist::assisted_extract;
use crate::browser::client::AutomationConfig;
use crate::browser::session::BrowserSession;
use crate::browser::wait::wait_for_condition;
use crate::error::ScrapeError;
use crate::extract::{self, COURSE_CODE_SEARCH_RE};
use crate::records::{AttendanceRecord, TimetableCell};

/// Navigates to a deep-link fragment and waits until the rendered
/// page satisfies `ready`, then returns the full HTML. The SPA
/// paints its shell immediately and fills tables in later, so
/// arrival at the URL alone proves nothing.
async fn navigate_and_settle<F>(
    page: &Page,
    config: &AutomationConfig,
    url: &str,
    what: &str,
    ready: F,
) -> Result<String, ScrapeError>
where
    F: Fn(&str) -> bool,
{
    debug!(url, "navigating");
    page.goto(url)
        .await
        .map_err(|e| ScrapeError::infra(format!("navigation to {what} failed: {e}")))?;

    let ready = &ready;
    wait_for_condition(what, config.content_timeout, config.poll_interval, move || async move {
        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::infra(format!("failed to read page content: {e}")))?;
        Ok(ready(&html).then_some(html))
    })
    .await
}

/// Loads the attendance report and parses it with the shared table
/// extractor.
///
/// The report widget does not render its table until its control is
/// clicked, and it sometimes opens in a separate page, so after
/// navigating this hands off to the assisted loop rather than a
/// plain content wait.
pub async fn fetch_attendance(
    session: &BrowserSession,
    config: &AutomationConfig,
) -> Result<Vec<AttendanceRecord>, ScrapeError> {
    let url = config.attendance_url();
    debug!(%url, "navigating");
    session
        .page()
        .goto(url)
        .await
        .map_err(|e| ScrapeError::infra(format!("navigation to attendance report failed: {e}")))?;

    let records = assisted_extract(session, &config.assist, "attendance report", |html| {
        extract::extract_attendance(html)
    })
    .await?;
    info!(courses = records.len(), "attendance extracted via browser");
    Ok(records)
}

/// Loads the timetable page for a batch and joins the master grid
/// with the student's enrolled slots.
pub async fn fetch_timetable(
    page: &Page,
    config: &AutomationConfig,
    batch: u8,
) -> Result<Vec<TimetableCell>, ScrapeError> {
    let url = config.timetable_url(batch);
    let html = navigate_and_settle(page, config, &url, "timetable page", |html| {
        html.contains("Day 1") && COURSE_CODE_SEARCH_RE.is_match(html)
    })
    .await?;

    let grid = extract::extract_master_grid(&html)?;
    let slots = extract::extract_enrolled_slots(&html)?;
    let cells = extract::join_timetable(&grid, &slots);
    info!(
        batch,
        grid_cells = grid.len(),
        enrolled = slots.len(),
        "timetable extracted via browser"
    );
    Ok(cells)
}
