//! Error taxonomy shared by both portal clients.
//!
//! Four classes, surfaced distinctly to callers:
//! - input: rejected before any network/browser activity
//! - auth: wrong credentials or captcha, detected from response content
//! - structural: an expected HTML/DOM structure was absent, the
//!   dominant failure mode given upstream markup volatility
//! - infra: timeouts, connection failures, browser crashes

use thiserror::Error;

/// Errors that can occur during a scrape operation.
#[derive(Debug, Error, Clone)]
pub enum ScrapeError {
    /// A required request field is missing or invalid.
    #[error("Missing or invalid field: {field}")]
    Input { field: String },

    /// The portal rejected the credentials or captcha.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// An expected page structure was not found.
    #[error("{message}")]
    Structural { message: String },

    /// Network, timeout, or browser-level failure.
    #[error("Infrastructure error: {message}")]
    Infra { message: String },
}

impl ScrapeError {
    pub fn input(field: impl Into<String>) -> Self {
        ScrapeError::Input {
            field: field.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ScrapeError::Auth {
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        ScrapeError::Structural {
            message: message.into(),
        }
    }

    pub fn infra(message: impl Into<String>) -> Self {
        ScrapeError::Infra {
            message: message.into(),
        }
    }

    /// Short machine-readable class name, carried on the wire so the
    /// caller can branch without string matching.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Input { .. } => "input",
            ScrapeError::Auth { .. } => "auth",
            ScrapeError::Structural { .. } => "structural",
            ScrapeError::Infra { .. } => "infra",
        }
    }

    /// Returns true if the session should be re-established before
    /// retrying this operation.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, ScrapeError::Auth { .. })
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Infra {
                message: format!("request timed out: {err}"),
            }
        } else {
            ScrapeError::Infra {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        ScrapeError::Infra {
            message: format!("bad URL: {err}"),
        }
    }
}
