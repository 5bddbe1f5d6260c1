use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ScrapeError;

/// A running headless browser plus the background task that drains
/// its CDP event stream.
///
/// The chromium child process is tied to this struct's lifetime:
/// always call [`BrowserSession::close`] when done. `Drop` aborts
/// the handler task so a session dropped on an error path does not
/// leak a spinning future, and chromiumoxide kills the child when
/// the `Browser` itself is dropped.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    /// Launches chromium and opens a single blank page.
    pub async fn launch(headless: bool, nav_timeout: Duration) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(nav_timeout)
            .viewport(None)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::infra(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::infra(format!("failed to launch browser: {e}")))?;

        // The handler stream must be polled for the browser to make
        // progress at all.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::infra(format!("failed to open page: {e}")))?;

        debug!(headless, "browser session started");
        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// The primary page every flow drives.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// All currently open pages, primary first. Portal popups land
    /// here too, which the assisted extraction loop sweeps over.
    pub async fn pages(&self) -> Result<Vec<Page>, ScrapeError> {
        self.browser
            .pages()
            .await
            .map_err(|e| ScrapeError::infra(format!("failed to list pages: {e}")))
    }

    /// Shuts the browser down. Best effort: a browser that already
    /// died still counts as closed.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser wait after close failed");
        }
        self.handler_task.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
