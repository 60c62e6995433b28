// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake remote executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommandOutput, RemoteError, RemoteExecutor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Connect {
        host: String,
        credentials: PathBuf,
    },
    Upload {
        session: String,
        remote_path: String,
    },
    Download {
        session: String,
        remote_path: String,
    },
    Execute {
        session: String,
        commands: Vec<String>,
    },
    Close {
        session: String,
    },
}

struct FakeRemoteState {
    calls: Vec<RemoteCall>,
    /// (needle, output): first needle found in the joined commands wins
    responses: Vec<(String, CommandOutput)>,
    uploads: BTreeMap<String, String>,
    open: HashSet<String>,
    next_id: u64,
    connect_error: Option<String>,
    execute_delay: Option<Duration>,
}

/// Fake remote executor for testing
#[derive(Clone)]
pub struct FakeRemoteExecutor {
    inner: Arc<Mutex<FakeRemoteState>>,
}

impl Default for FakeRemoteExecutor {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeRemoteState {
                calls: Vec::new(),
                responses: Vec::new(),
                uploads: BTreeMap::new(),
                open: HashSet::new(),
                next_id: 1,
                connect_error: None,
                execute_delay: None,
            })),
        }
    }
}

impl FakeRemoteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any command sequence containing `needle`.
    /// Sequences matching nothing succeed with empty output.
    pub fn respond(&self, needle: &str, output: CommandOutput) {
        self.inner
            .lock()
            .responses
            .push((needle.to_string(), output));
    }

    /// Make every subsequent `connect` fail with `message`.
    pub fn fail_connect(&self, message: &str) {
        self.inner.lock().connect_error = Some(message.to_string());
    }

    /// Delay every `execute` call, to keep a submission in flight.
    pub fn set_execute_delay(&self, delay: Duration) {
        self.inner.lock().execute_delay = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Every executed command sequence, in order
    pub fn executed(&self) -> Vec<Vec<String>> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Execute { commands, .. } => Some(commands.clone()),
                _ => None,
            })
            .collect()
    }

    /// Content of the file uploaded to `remote_path`, if any
    pub fn uploaded(&self, remote_path: &str) -> Option<String> {
        self.inner.lock().uploads.get(remote_path).cloned()
    }

    /// Number of sessions connected but not yet closed
    pub fn open_sessions(&self) -> usize {
        self.inner.lock().open.len()
    }

    fn check_session(state: &FakeRemoteState, session: &str) -> Result<(), RemoteError> {
        if state.open.contains(session) {
            Ok(())
        } else {
            Err(RemoteError::UnknownSession(session.to_string()))
        }
    }
}

#[async_trait]
impl RemoteExecutor for FakeRemoteExecutor {
    async fn connect(&self, host: &str, credentials: &Path) -> Result<String, RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Connect {
            host: host.to_string(),
            credentials: credentials.to_path_buf(),
        });
        if let Some(message) = &inner.connect_error {
            return Err(RemoteError::ConnectFailed(message.clone()));
        }
        let id = format!("fake-{}", inner.next_id);
        inner.next_id += 1;
        inner.open.insert(id.clone());
        Ok(id)
    }

    async fn upload(
        &self,
        session: &str,
        local: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError> {
        let content = std::fs::read_to_string(local)
            .map_err(|e| RemoteError::TransferFailed(format!("{}: {}", local.display(), e)))?;
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Upload {
            session: session.to_string(),
            remote_path: remote_path.to_string(),
        });
        Self::check_session(&inner, session)?;
        inner.uploads.insert(remote_path.to_string(), content);
        Ok(())
    }

    async fn download(
        &self,
        session: &str,
        remote_path: &str,
        local: &Path,
    ) -> Result<(), RemoteError> {
        let content = {
            let mut inner = self.inner.lock();
            inner.calls.push(RemoteCall::Download {
                session: session.to_string(),
                remote_path: remote_path.to_string(),
            });
            Self::check_session(&inner, session)?;
            inner.uploads.get(remote_path).cloned().ok_or_else(|| {
                RemoteError::TransferFailed(format!("no such remote file: {}", remote_path))
            })?
        };
        std::fs::write(local, content)
            .map_err(|e| RemoteError::TransferFailed(format!("{}: {}", local.display(), e)))
    }

    async fn execute(
        &self,
        session: &str,
        commands: &[String],
    ) -> Result<CommandOutput, RemoteError> {
        let (output, delay) = {
            let mut inner = self.inner.lock();
            inner.calls.push(RemoteCall::Execute {
                session: session.to_string(),
                commands: commands.to_vec(),
            });
            Self::check_session(&inner, session)?;
            let joined = commands.join("\n");
            let output = inner
                .responses
                .iter()
                .find(|(needle, _)| joined.contains(needle.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default();
            (output, inner.execute_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(output)
    }

    async fn close(&self, session: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall::Close {
            session: session.to_string(),
        });
        inner.open.remove(session);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
