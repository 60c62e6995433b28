// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `config.toml` loading.
//!
//! Every key is optional. A missing file at the default location means
//! defaults; a missing file named explicitly is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rv_adapters::{HttpConfig, SshConfig};
use rv_engine::{EngineConfig, RemoteSettings, DEFAULT_PRUNE_THRESHOLD};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub remote: RemoteSection,
    pub services: ServicesSection,
    pub engine: EngineSection,
    pub notify: NotifySection,
}

/// `[remote]`: the build host submissions run on
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSection {
    pub host: String,
    pub credentials_file: PathBuf,
    pub workspace_dir: String,
    pub command_timeout_secs: u64,
    pub transfer_timeout_secs: u64,
    pub conditions_command: String,
    pub upload_command: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        let remote = RemoteSettings::default();
        Self {
            host: remote.host,
            credentials_file: remote.credentials_file,
            workspace_dir: remote.workspace_dir,
            command_timeout_secs: 3600,
            transfer_timeout_secs: 120,
            conditions_command: remote.conditions_command,
            upload_command: remote.upload_command,
        }
    }
}

/// `[services]`: REST endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesSection {
    pub job_manager_url: String,
    pub catalog_url: String,
    /// Base URL of this service, linked from notifications.
    pub service_url: String,
    pub request_timeout_secs: u64,
    /// PEM client certificate and key for the REST services.
    pub identity_file: Option<PathBuf>,
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            job_manager_url: "https://cmsweb.cern.ch".to_string(),
            catalog_url: "https://cmsweb.cern.ch".to_string(),
            service_url: String::new(),
            request_timeout_secs: 60,
            identity_file: None,
        }
    }
}

/// `[engine]`: worker pool, locks and lifecycle timing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub workers: usize,
    pub queue_capacity: usize,
    pub lock_prune_threshold: usize,
    pub campaign_window_secs: u64,
    pub archive_threshold_secs: u64,
    pub approve_delay_ms: u64,
    pub poll_interval_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 256,
            lock_prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            campaign_window_secs: 3600,
            archive_threshold_secs: 7 * 24 * 3600,
            approve_delay_ms: 3000,
            poll_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    #[default]
    Desktop,
    None,
}

/// `[notify]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifySection {
    pub backend: NotifyBackend,
    pub recipients: Vec<String>,
}

impl Config {
    /// Resolve the config path: `--config` > RVT_CONFIG > `<state_dir>/config.toml`.
    pub fn load(flag: Option<&Path>, state_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = flag {
            return Self::from_file(path);
        }
        if let Some(path) = crate::env::config_path() {
            return Self::from_file(&path);
        }
        let default_path = state_dir.join("config.toml");
        if !default_path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&default_path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            workers: self.engine.workers,
            queue_capacity: self.engine.queue_capacity,
            lock_prune_threshold: self.engine.lock_prune_threshold,
            campaign_window: Duration::from_secs(self.engine.campaign_window_secs),
            archive_threshold: Duration::from_secs(self.engine.archive_threshold_secs),
            approve_delay: Duration::from_millis(self.engine.approve_delay_ms),
            poll_interval: Duration::from_secs(self.engine.poll_interval_secs),
            recipients: self.notify.recipients.clone(),
            service_url: self.services.service_url.trim_end_matches('/').to_string(),
            remote: RemoteSettings {
                host: self.remote.host.clone(),
                credentials_file: self.remote.credentials_file.clone(),
                workspace_dir: self.remote.workspace_dir.clone(),
                conditions_command: self.remote.conditions_command.clone(),
                upload_command: self.remote.upload_command.clone(),
            },
        }
    }

    pub fn ssh_config(&self) -> SshConfig {
        SshConfig {
            command_timeout: Duration::from_secs(self.remote.command_timeout_secs),
            transfer_timeout: Duration::from_secs(self.remote.transfer_timeout_secs),
            ..SshConfig::default()
        }
    }

    pub fn job_manager_http(&self) -> HttpConfig {
        self.http(&self.services.job_manager_url)
    }

    pub fn catalog_http(&self) -> HttpConfig {
        self.http(&self.services.catalog_url)
    }

    fn http(&self, base_url: &str) -> HttpConfig {
        HttpConfig::new(base_url)
            .with_timeout(Duration::from_secs(self.services.request_timeout_secs))
            .with_identity(self.services.identity_file.clone())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
