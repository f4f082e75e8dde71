//! Environment-driven configuration.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::client::ClientError;

/// Base address used when `ERPNEXT_URL` is not set.
pub const DEFAULT_URL: &str = "http://localhost:8000";

/// Connection settings for the remote ERPNext server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server base address, without a trailing slash.
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// `ERPNEXT_URL` falls back to [`DEFAULT_URL`]; a missing
    /// `ERPNEXT_API_KEY` or `ERPNEXT_API_SECRET` is a startup fault.
    pub fn from_env() -> Result<Self, ClientError> {
        let url = env::var("ERPNEXT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = env::var("ERPNEXT_API_KEY")
            .map_err(|_| ClientError::Config("ERPNEXT_API_KEY must be set".to_string()))?;
        let api_secret = env::var("ERPNEXT_API_SECRET")
            .map_err(|_| ClientError::Config("ERPNEXT_API_SECRET must be set".to_string()))?;
        Ok(Self::new(url, api_key, api_secret))
    }
}

/// Transport tuning for the adapter.
///
/// Controls how requests are sent over the network.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Per-request ceiling for the default operations.
    pub timeout: Duration,
    /// Per-request ceiling for file transfers.
    pub file_timeout: Duration,
    /// Additional HTTP headers to send with every request.
    pub headers: Option<HashMap<String, String>>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            file_timeout: Duration::from_secs(60),
            headers: None,
        }
    }
}

impl ConnectOptions {
    /// Create new default connect options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Set the file-transfer timeout.
    pub fn with_file_timeout(mut self, duration: Duration) -> Self {
        self.file_timeout = duration;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
