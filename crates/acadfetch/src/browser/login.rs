use chromiumoxide::Page;
use tracing::{debug, info, warn};

use crate::browser::client::AutomationConfig;
use crate::browser::frames::FrameProbe;
use crate::browser::wait::wait_for_condition;
use crate::error::ScrapeError;

/// Where the portal login flow currently stands. Logged at every
/// transition so a stuck run can be pinpointed from the trace alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    NotStarted,
    OnLandingPage,
    SearchingForCredentialFrame,
    CredentialFrameFound,
    SubmittingCredentials,
    AwaitingPostLoginNavigation,
    Authenticated,
    Failed,
}

/// Drives the nested-iframe SPA login end to end.
///
/// The portal renders its credential widget inside an iframe that
/// appears asynchronously, and may split username and password over
/// two screens. An auth failure keeps the password field on screen,
/// which is how we distinguish bad credentials from a slow redirect.
pub async fn perform_login(
    page: &Page,
    config: &AutomationConfig,
    username: &str,
    password: &str,
) -> Result<(), ScrapeError> {
    let mut stage = LoginStage::NotStarted;
    let probe = FrameProbe::new(page);

    page.goto(config.base_url.as_str())
        .await
        .map_err(|e| ScrapeError::infra(format!("failed to open portal: {e}")))?;
    stage = advance(stage, LoginStage::OnLandingPage);

    // The credential iframe loads after the shell page; poll for the
    // username field anywhere in the frame tree.
    stage = advance(stage, LoginStage::SearchingForCredentialFrame);
    let probe_ref = &probe;
    let username_sel = config.username_selector.as_str();
    let result = wait_for_condition(
        "login form",
        config.login_form_timeout,
        config.poll_interval,
        move || async move {
            let hit = probe_ref.find(username_sel).await?;
            Ok(hit.found.then_some(hit))
        },
    )
    .await;
    let hit = match result {
        Ok(hit) => hit,
        Err(e) => {
            advance(stage, LoginStage::Failed);
            return Err(e);
        }
    };
    stage = advance(stage, LoginStage::CredentialFrameFound);
    debug!(depth = hit.depth, "credential frame located");

    if !probe.set_value(&config.username_selector, username).await? {
        advance(stage, LoginStage::Failed);
        return Err(ScrapeError::structural("username field vanished"));
    }

    // Two-screen flows gate the password field behind a "next"
    // control; single-screen flows have no such control and the
    // password field is already visible.
    let password_hit = probe.find(&config.password_selector).await?;
    if !(password_hit.found && password_hit.visible) {
        if probe.click(&config.next_selector).await? {
            debug!("advanced past username screen");
        }
        let password_sel = config.password_selector.as_str();
        let result = wait_for_condition(
            "password field",
            config.login_form_timeout,
            config.poll_interval,
            move || async move {
                let hit = probe_ref.find(password_sel).await?;
                Ok((hit.found && hit.visible).then_some(()))
            },
        )
        .await;
        if let Err(e) = result {
            advance(stage, LoginStage::Failed);
            return Err(e);
        }
    }

    if !probe.set_value(&config.password_selector, password).await? {
        advance(stage, LoginStage::Failed);
        return Err(ScrapeError::structural("password field vanished"));
    }

    stage = advance(stage, LoginStage::SubmittingCredentials);
    if !probe.click(&config.submit_selector).await? {
        warn!("submit control not found, falling back to enter key");
        probe.press_enter(&config.password_selector).await?;
    }

    // The portal signals success by navigating to the student
    // dashboard. Polling the URL directly also covers redirects that
    // fire before a navigation listener could attach.
    stage = advance(stage, LoginStage::AwaitingPostLoginNavigation);
    let result = wait_for_condition(
        "post-login navigation",
        config.post_login_timeout,
        config.poll_interval,
        move || async move { Ok(authenticated_url(page, config).await?.then_some(())) },
    )
    .await;
    match result {
        Ok(()) => {}
        Err(timeout) => {
            // No navigation observed within budget. If the password
            // field is still visible the credentials were rejected;
            // otherwise give the URL one last look before giving up.
            let still_on_form = probe
                .find(&config.password_selector)
                .await
                .map(|h| h.found && h.visible)
                .unwrap_or(false);
            if still_on_form {
                advance(stage, LoginStage::Failed);
                return Err(ScrapeError::auth("portal rejected the credentials"));
            }
            if !authenticated_url(page, config).await.unwrap_or(false) {
                advance(stage, LoginStage::Failed);
                return Err(timeout);
            }
        }
    }

    advance(stage, LoginStage::Authenticated);
    info!("portal login complete");
    Ok(())
}

async fn authenticated_url(page: &Page, config: &AutomationConfig) -> Result<bool, ScrapeError> {
    let url = page
        .url()
        .await
        .map_err(|e| ScrapeError::infra(format!("failed to read page url: {e}")))?;
    Ok(url
        .map(|u| config.authenticated_markers.iter().any(|m| u.contains(m.as_str())))
        .unwrap_or(false))
}

fn advance(from: LoginStage, to: LoginStage) -> LoginStage {
    debug!(?from, ?to, "login stage");
    to
}
