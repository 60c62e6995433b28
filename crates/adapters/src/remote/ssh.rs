// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ssh/scp remote executor

use super::{CommandOutput, RemoteError, RemoteExecutor};
use crate::subprocess::{
    run_with_input, run_with_timeout, CONNECT_TIMEOUT, REMOTE_COMMAND_TIMEOUT, TRANSFER_TIMEOUT,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Settings for the ssh executor
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub ssh_program: PathBuf,
    pub scp_program: PathBuf,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_program: crate::env::ssh_program(),
            scp_program: crate::env::scp_program(),
            connect_timeout: CONNECT_TIMEOUT,
            command_timeout: REMOTE_COMMAND_TIMEOUT,
            transfer_timeout: TRANSFER_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
struct SshSession {
    host: String,
    identity: PathBuf,
}

/// Remote executor driving the system `ssh` and `scp` clients.
///
/// Each call is a fresh non-interactive client invocation. A session only
/// remembers the host and identity file it was opened with.
#[derive(Clone)]
pub struct SshExecutor {
    config: Arc<SshConfig>,
    sessions: Arc<Mutex<HashMap<String, SshSession>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new(SshConfig::default())
    }
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn session(&self, id: &str) -> Result<SshSession, RemoteError> {
        self.sessions
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::UnknownSession(id.to_string()))
    }

    fn ssh(&self, session: &SshSession) -> Command {
        let mut cmd = Command::new(&self.config.ssh_program);
        cmd.args(["-o", "BatchMode=yes"])
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.config.connect_timeout.as_secs().max(1)
            ))
            .arg("-i")
            .arg(&session.identity)
            .arg(&session.host);
        cmd
    }

    fn scp(&self, session: &SshSession) -> Command {
        let mut cmd = Command::new(&self.config.scp_program);
        cmd.args(["-q", "-o", "BatchMode=yes"])
            .arg("-i")
            .arg(&session.identity);
        cmd
    }

    async fn transfer(&self, cmd: Command, description: &str) -> Result<(), RemoteError> {
        let output = run_with_timeout(cmd, self.config.transfer_timeout, description)
            .await
            .map_err(RemoteError::TransferFailed)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::TransferFailed(format!(
                "{} exited with {}: {}",
                description,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn connect(&self, host: &str, credentials: &Path) -> Result<String, RemoteError> {
        if !credentials.exists() {
            return Err(RemoteError::ConnectFailed(format!(
                "credentials file does not exist: {}",
                credentials.display()
            )));
        }

        let session = SshSession {
            host: host.to_string(),
            identity: credentials.to_path_buf(),
        };

        // Probe the host so bad credentials fail here, not mid-submission
        let mut probe = self.ssh(&session);
        probe.arg("true");
        let output = run_with_timeout(probe, self.config.connect_timeout, "ssh connect")
            .await
            .map_err(RemoteError::ConnectFailed)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::ConnectFailed(format!(
                "{}: {}",
                host,
                stderr.trim()
            )));
        }

        let id = format!("ssh-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.lock().insert(id.clone(), session);
        Ok(id)
    }

    async fn upload(
        &self,
        session: &str,
        local: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError> {
        let s = self.session(session)?;
        let mut cmd = self.scp(&s);
        cmd.arg(local).arg(format!("{}:{}", s.host, remote_path));
        self.transfer(cmd, "scp upload").await
    }

    async fn download(
        &self,
        session: &str,
        remote_path: &str,
        local: &Path,
    ) -> Result<(), RemoteError> {
        let s = self.session(session)?;
        let mut cmd = self.scp(&s);
        cmd.arg(format!("{}:{}", s.host, remote_path)).arg(local);
        self.transfer(cmd, "scp download").await
    }

    async fn execute(
        &self,
        session: &str,
        commands: &[String],
    ) -> Result<CommandOutput, RemoteError> {
        let s = self.session(session)?;
        let mut cmd = self.ssh(&s);
        cmd.args(["bash", "-s"]);

        let mut script = commands.join("\n");
        script.push('\n');

        let output = run_with_input(cmd, &script, self.config.command_timeout, "ssh execute")
            .await
            .map_err(RemoteError::CommandFailed)?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // Killed by signal: no code
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn close(&self, session: &str) -> Result<(), RemoteError> {
        self.sessions.lock().remove(session);
        Ok(())
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
