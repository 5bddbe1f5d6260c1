use crate::browser::PortalClient;
use crate::config::AppConfig;
use crate::session::SessionClient;

/// Shared server state. Clients are constructed per request from the
/// config because neither portal session survives a call anyway.
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn session_client(&self) -> SessionClient {
        SessionClient::new(self.config.session.clone())
    }

    pub fn portal_client(&self) -> PortalClient {
        PortalClient::new(self.config.automation.clone())
    }
}
