//! Client configuration

use std::time::Duration;

/// Configuration for the API client
#[derive(Clone, Debug)]
pub struct Config {
    /// Server endpoint, e.g. `http://localhost:7600`
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Config {
    /// Create with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7600".to_string(),
            timeout: Duration::from_secs(120),
            user_agent: format!("sealdrop-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
