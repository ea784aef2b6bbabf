use std::net::SocketAddr;
use std::time::Duration;

use crate::error::BridgeError;

/// Bridge configuration. Built once at startup and handed to the client and
/// server; nothing below `main` reads the environment.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the agent service, without a trailing slash.
    pub agent_base_url: String,
    pub api_key: Option<String>,
    pub app_name: String,
    pub user_id: String,
    /// Whole-request timeout applied by the HTTP client, body included.
    pub request_timeout: Duration,
    /// Serve the canned fixture turn instead of calling the agent.
    pub mock_upstream: bool,
    pub bind_addr: SocketAddr,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            agent_base_url: "http://localhost:8000".into(),
            api_key: None,
            app_name: "agent".into(),
            user_id: "web-user".into(),
            request_timeout: Duration::from_secs(120),
            mock_upstream: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `AGENT_*` / `BRIDGE_BIND` environment variables.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let mut config = Self::default();

        if let Some(url) = lookup("AGENT_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(key) = lookup("AGENT_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(app) = lookup("AGENT_APP_NAME") {
            config.app_name = app;
        }
        if let Some(user) = lookup("AGENT_USER_ID") {
            config.user_id = user;
        }
        if let Some(secs) = lookup("AGENT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                BridgeError::Config(format!("AGENT_TIMEOUT_SECS must be a whole number, got {secs:?}"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("AGENT_MOCK") {
            config.mock_upstream = parse_flag(&flag);
        }
        if let Some(addr) = lookup("BRIDGE_BIND") {
            config.bind_addr = addr.trim().parse().map_err(|_| {
                BridgeError::Config(format!("BRIDGE_BIND must be host:port, got {addr:?}"))
            })?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.agent_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_mock_upstream(mut self, mock: bool) -> Self {
        self.mock_upstream = mock;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
