use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::browser::frames::FrameProbe;
use crate::browser::session::BrowserSession;
use crate::error::ScrapeError;

/// Tuning for the assisted extraction loop.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Hard ceiling on the whole loop.
    pub overall_timeout: Duration,
    /// Minimum gap between clicks of the helper control. Clicking the
    /// portal's report button repeatedly gets the session throttled.
    pub click_cooldown: Duration,
    pub poll_interval: Duration,
    /// Element id of the control that opens the report.
    pub control_id: String,
    /// Exact on-screen label of the same control, used when the id
    /// is not present in the current portal build.
    pub control_text: String,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_secs(120),
            click_cooldown: Duration::from_secs(15),
            poll_interval: Duration::from_secs(2),
            control_id: "zc-viewreport".to_string(),
            control_text: "View Report".to_string(),
        }
    }
}

/// Repeatedly sweeps every open page for an extractable report,
/// nudging the portal by clicking the report control when nothing
/// has appeared yet.
///
/// Some report pages only render after a control is clicked, and the
/// portal sometimes opens the report in a popup rather than the
/// driven page. The loop therefore checks all pages each round, and
/// a human watching a headful browser can click through any
/// interstitial; whatever state the pages end up in gets swept on
/// the next round.
pub async fn assisted_extract<T, P>(
    session: &BrowserSession,
    config: &AssistConfig,
    what: &str,
    parse: P,
) -> Result<Vec<T>, ScrapeError>
where
    P: Fn(&str) -> Result<Vec<T>, ScrapeError>,
{
    let deadline = Instant::now() + config.overall_timeout;
    let mut last_click: Option<Instant> = None;
    let mut rounds = 0u32;

    loop {
        rounds += 1;

        // Fast path first: the report may already be on screen, in
        // which case no click is ever issued.
        for page in session.pages().await? {
            let html = match page.content().await {
                Ok(html) => html,
                Err(e) => {
                    trace!(error = %e, "page content unavailable this round");
                    continue;
                }
            };
            match parse(&html) {
                Ok(rows) if !rows.is_empty() => {
                    info!(what, rounds, rows = rows.len(), "assisted extraction succeeded");
                    return Ok(rows);
                }
                Ok(_) => {}
                Err(e) => trace!(what, error = %e, "page not extractable yet"),
            }
        }

        if Instant::now() >= deadline {
            return Err(ScrapeError::structural(format!(
                "timed out after {}s waiting for the {what}; open the report manually and retry",
                config.overall_timeout.as_secs()
            )));
        }

        let cooled_down = last_click
            .map(|t| t.elapsed() >= config.click_cooldown)
            .unwrap_or(true);
        if cooled_down {
            let mut clicked = false;
            for page in session.pages().await? {
                let probe = FrameProbe::new(&page);
                match probe
                    .click_by_id_or_text(&config.control_id, &config.control_text)
                    .await
                {
                    Ok(true) => {
                        clicked = true;
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => trace!(error = %e, "click attempt failed on page"),
                }
            }
            if clicked {
                debug!(what, rounds, "clicked report control");
                last_click = Some(Instant::now());
            } else if rounds % 5 == 0 {
                warn!(what, rounds, "report control not found on any page");
            }
        }

        // A little jitter so retry rounds do not line up exactly with
        // the portal's own refresh cadence.
        let jitter = rand::thread_rng().gen_range(0..250);
        tokio::time::sleep(config.poll_interval + Duration::from_millis(jitter)).await;
    }
}
