// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables

use crate::lock::DEFAULT_PRUNE_THRESHOLD;
use std::path::PathBuf;
use std::time::Duration;

/// Where and how submissions run on the remote build host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub host: String,
    pub credentials_file: PathBuf,
    /// Per-RelVal work directories are created under this path.
    pub workspace_dir: String,
    /// Prints `<auto-key> <value>` for each requested auto condition.
    pub conditions_command: String,
    /// Uploads one config file and prints its `DocID` line.
    pub upload_command: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            credentials_file: PathBuf::from("credentials"),
            workspace_dir: "rvt-submissions".to_string(),
            conditions_command: "resolve_conditions".to_string(),
            upload_command: "config_upload".to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Submission workers
    pub workers: usize,
    pub queue_capacity: usize,
    pub lock_prune_threshold: usize,
    /// Submissions in the same release and batch within this window share
    /// a campaign timestamp.
    pub campaign_window: Duration,
    /// Time an archived workflow must sit before its RelVal is archived.
    pub archive_threshold: Duration,
    /// Pause between job creation and workflow approval
    pub approve_delay: Duration,
    pub poll_interval: Duration,
    pub recipients: Vec<String>,
    /// Base URL printed in notifications
    pub service_url: String,
    pub remote: RemoteSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 256,
            lock_prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            campaign_window: Duration::from_secs(3600),
            archive_threshold: Duration::from_secs(7 * 24 * 3600),
            approve_delay: Duration::from_millis(3000),
            poll_interval: Duration::from_secs(600),
            recipients: Vec::new(),
            service_url: String::new(),
            remote: RemoteSettings::default(),
        }
    }
}
