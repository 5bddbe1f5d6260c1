use std::env;
use std::net::SocketAddr;

use crate::browser::AutomationConfig;
use crate::session::SessionConfig;

/// Process-wide configuration. Defaults work against the live
/// portals; environment variables override the knobs that differ
/// between local debugging and deployment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub session: SessionConfig,
    pub automation: AutomationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8080).into(),
            session: SessionConfig::default(),
            automation: AutomationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds a config from defaults plus environment overrides.
    ///
    /// - `HOST` / `PORT`: bind address.
    /// - `PORTAL_A_URL` / `PORTAL_B_URL`: portal base URLs, for
    ///   pointing the scraper at a fixture server.
    /// - `HEADFUL=1`: show the browser, needed for the assisted
    ///   extraction loop when a human has to click through.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        if let Ok(addr) = format!("{host}:{port}").parse() {
            config.bind_addr = addr;
        }

        if let Ok(url) = env::var("PORTAL_A_URL") {
            config.session.base_url = url;
        }
        if let Ok(url) = env::var("PORTAL_B_URL") {
            config.automation.base_url = url;
        }
        if env::var("HEADFUL").map(|v| v == "1").unwrap_or(false) {
            config.automation.headless = false;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_portals_are_https() {
        let config = AppConfig::default();
        assert!(config.session.base_url.starts_with("https://"));
        assert!(config.automation.base_url.starts_with("https://"));
    }
}
