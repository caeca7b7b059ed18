pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod session;
pub mod tui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::api::ApiClient;
use crate::config::Config;
use crate::session::SessionStore;

/// Shared handles built once at startup and passed to every command and
/// screen.
pub struct AppContext {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(ApiClient::new(
            &config.server.api_url,
            Duration::from_secs(config.server.timeout_secs),
            Some(Config::session_file()),
        )?);
        let session = Arc::new(SessionStore::new(api.clone()));
        Ok(Self {
            config,
            api,
            session,
        })
    }
}
