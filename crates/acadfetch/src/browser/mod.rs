//! Browser-automation client for the single-page-app portal
//! (Portal B) and the human-assisted extraction loop.
//!
//! All work against one browser instance is strictly sequential:
//! navigation, typing, clicking, and waits are ordered steps, and
//! every wait is bounded. The browser process is closed on every
//! exit path (success, handled failure, or panic-adjacent error)
//! via [`BrowserSession`].

mod assist;
mod client;
mod extract;
mod frames;
mod login;
mod session;
mod wait;

pub use assist::{assisted_extract, AssistConfig};
pub use client::{AutomationConfig, PortalClient};
pub use frames::FrameProbe;
pub use login::LoginStage;
pub use session::BrowserSession;
pub use wait::wait_for_condition;
