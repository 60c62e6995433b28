// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote execution adapters
//!
//! A remote executor opens a session on a build host, moves files in and
//! out of it, and runs command sequences there. Sessions are identified by
//! opaque string ids handed out by [`RemoteExecutor::connect`].

mod ssh;

pub use ssh::{SshConfig, SshExecutor};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemoteExecutor, RemoteCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from remote operations
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("transfer failed: {0}")]
    TransferFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Captured result of a remote command sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convenience constructor for a successful run.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Convenience constructor for a failed run.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// Adapter for running commands on a remote build host
#[async_trait]
pub trait RemoteExecutor: Clone + Send + Sync + 'static {
    /// Open a session to `host` authenticating with the credentials file.
    async fn connect(&self, host: &str, credentials: &Path) -> Result<String, RemoteError>;

    /// Copy a local file to `remote_path` on the session's host.
    async fn upload(&self, session: &str, local: &Path, remote_path: &str)
        -> Result<(), RemoteError>;

    /// Copy `remote_path` from the session's host to a local file.
    async fn download(
        &self,
        session: &str,
        remote_path: &str,
        local: &Path,
    ) -> Result<(), RemoteError>;

    /// Run the commands in order in one shell on the remote host.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`],
    /// not as an error.
    async fn execute(&self, session: &str, commands: &[String])
        -> Result<CommandOutput, RemoteError>;

    /// Release the session. Closing an unknown session is not an error.
    async fn close(&self, session: &str) -> Result<(), RemoteError>;
}
