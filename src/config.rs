//! Configuration for the research bridge.
//!
//! The host application hands the bridge a single endpoint base URL at
//! initialization (plugin settings). When the host provides nothing, the
//! endpoint is resolved from the `RESEARCH_ENDPOINT` environment variable,
//! falling back to `http://localhost:8000`.
//!
//! The base URL must carry an `http` or `https` scheme — the stream
//! transport derives its `ws`/`wss` scheme from it.

use std::time::Duration;

/// Fallback endpoint when neither the host nor the environment provides one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Default watchdog timeout for an in-flight query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Validated bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Backend base URL, without trailing slash.
    pub endpoint: String,
    /// How long to wait for a terminal event after admitting a query
    /// before synthesizing a local error. `None` disables the watchdog.
    pub query_timeout: Option<Duration>,
}

impl BridgeConfig {
    /// Build a configuration from a host-provided endpoint URL.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::BadScheme(endpoint.to_string()));
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            query_timeout: Some(DEFAULT_QUERY_TIMEOUT),
        })
    }

    /// Resolve a configuration from the environment, falling back to
    /// [`DEFAULT_ENDPOINT`].
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("RESEARCH_ENDPOINT") {
            Ok(url) if !url.trim().is_empty() => Self::new(&url),
            _ => Self::new(DEFAULT_ENDPOINT),
        }
    }

    /// Override the query watchdog timeout. `None` disables it.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }
}

/// Errors produced while validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("endpoint URL is empty")]
    EmptyEndpoint,
    #[error("endpoint URL must use http:// or https://: {0}")]
    BadScheme(String),
}
