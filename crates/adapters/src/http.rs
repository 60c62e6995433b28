// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared HTTP client construction for the REST-backed adapters

use std::path::PathBuf;
use std::time::Duration;

/// Default per-request timeout for external services.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("rvt/", env!("CARGO_PKG_VERSION"));

/// Connection settings for a REST service
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL without trailing slash, e.g. `https://cmsweb.example:8443`
    pub base_url: String,
    pub timeout: Duration,
    /// PEM file holding a client certificate and key, if the service wants one.
    pub identity: Option<PathBuf>,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: REQUEST_TIMEOUT,
            identity: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_identity(mut self, identity: Option<PathBuf>) -> Self {
        self.identity = identity;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Build a reqwest client for `config`.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, String> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT);

    if let Some(path) = &config.identity {
        let pem = std::fs::read(path)
            .map_err(|e| format!("failed to read identity {}: {}", path.display(), e))?;
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| format!("invalid identity {}: {}", path.display(), e))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| format!("failed to create HTTP client: {}", e))
}


#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
