//! Scraping core for two university portals that expose no API:
//! a cookie-session portal driven over plain HTTP (CSRF token,
//! image captcha, cookie jar) and a single-page-app portal driven
//! through a real browser. Both feed heuristic table extractors
//! that degrade to explicit, classified failures when the markup
//! shifts, and an HTTP surface exposes the whole thing to callers.

pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod records;
pub mod server;
pub mod session;
pub mod types;
