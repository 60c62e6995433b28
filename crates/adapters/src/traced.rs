// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::catalog::{CatalogError, DatasetCatalog, DatasetRecord};
use crate::jobs::{JobManager, JobManagerError, JobRecord};
use crate::remote::{CommandOutput, RemoteError, RemoteExecutor};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::Instrument;

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Wrapper that adds tracing to any RemoteExecutor
#[derive(Clone)]
pub struct TracedRemote<R> {
    inner: R,
}

impl<R> TracedRemote<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RemoteExecutor> RemoteExecutor for TracedRemote<R> {
    async fn connect(&self, host: &str, credentials: &Path) -> Result<String, RemoteError> {
        async {
            let start = Instant::now();
            let result = self.inner.connect(host, credentials).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(session) => tracing::info!(session = session.as_str(), elapsed_ms, "connected"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "connect failed"),
            }
            result
        }
        .instrument(tracing::info_span!("remote.connect", host))
        .await
    }

    async fn upload(
        &self,
        session: &str,
        local: &Path,
        remote_path: &str,
    ) -> Result<(), RemoteError> {
        let result = self.inner.upload(session, local, remote_path).await;
        tracing::info_span!("remote.upload", session, remote_path).in_scope(|| match &result {
            Ok(()) => tracing::debug!(local = %local.display(), "uploaded"),
            Err(e) => tracing::error!(error = %e, "upload failed"),
        });
        result
    }

    async fn download(
        &self,
        session: &str,
        remote_path: &str,
        local: &Path,
    ) -> Result<(), RemoteError> {
        let result = self.inner.download(session, remote_path, local).await;
        tracing::info_span!("remote.download", session, remote_path).in_scope(|| match &result {
            Ok(()) => tracing::debug!(local = %local.display(), "downloaded"),
            Err(e) => tracing::error!(error = %e, "download failed"),
        });
        result
    }

    async fn execute(
        &self,
        session: &str,
        commands: &[String],
    ) -> Result<CommandOutput, RemoteError> {
        async {
            tracing::info!(command_count = commands.len(), "starting");
            let start = Instant::now();
            let result = self.inner.execute(session, commands).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(out) if out.success() => tracing::info!(
                    elapsed_ms,
                    stdout_len = out.stdout.len(),
                    "commands finished"
                ),
                Ok(out) => tracing::warn!(
                    elapsed_ms,
                    exit_code = out.exit_code,
                    stderr = %out.stderr.trim(),
                    "commands exited non-zero"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "execute failed"),
            }
            result
        }
        .instrument(tracing::info_span!("remote.execute", session))
        .await
    }

    async fn close(&self, session: &str) -> Result<(), RemoteError> {
        let result = self.inner.close(session).await;
        tracing::debug!(session, "closed");
        result
    }
}

/// Wrapper that adds tracing to any JobManager
#[derive(Clone)]
pub struct TracedJobManager<J> {
    inner: J,
}

impl<J> TracedJobManager<J> {
    pub fn new(inner: J) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<J: JobManager> JobManager for TracedJobManager<J> {
    async fn submit(&self, job_spec: &serde_json::Value) -> Result<String, JobManagerError> {
        let prep_id = job_spec
            .get("PrepID")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        async {
            let start = Instant::now();
            let result = self.inner.submit(job_spec).await;
            let elapsed_ms = elapsed_ms(start);
            match &result {
                Ok(workflow) => {
                    tracing::info!(workflow = workflow.as_str(), elapsed_ms, "job submitted")
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "submit failed"),
            }
            result
        }
        .instrument(tracing::info_span!("jobs.submit", prep_id))
        .await
    }

    async fn set_status(&self, workflow: &str, status: &str) -> Result<(), JobManagerError> {
        let result = self.inner.set_status(workflow, status).await;
        tracing::info_span!("jobs.set_status", workflow, status).in_scope(|| match &result {
            Ok(()) => tracing::info!("status changed"),
            Err(e) => tracing::error!(error = %e, "status change failed"),
        });
        result
    }

    async fn fetch(&self, prep_id: &str) -> Result<Vec<JobRecord>, JobManagerError> {
        let start = Instant::now();
        let result = self.inner.fetch(prep_id).await;
        let elapsed_ms = elapsed_ms(start);
        match &result {
            Ok(records) => tracing::debug!(prep_id, count = records.len(), elapsed_ms, "fetched"),
            Err(e) => tracing::error!(prep_id, elapsed_ms, error = %e, "fetch failed"),
        }
        result
    }
}

/// Wrapper that adds tracing to any DatasetCatalog
#[derive(Clone)]
pub struct TracedCatalog<D> {
    inner: D,
}

impl<D> TracedCatalog<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<D: DatasetCatalog> DatasetCatalog for TracedCatalog<D> {
    async fn list(&self, datasets: &[String]) -> Result<Vec<DatasetRecord>, CatalogError> {
        let start = Instant::now();
        let result = self.inner.list(datasets).await;
        let elapsed_ms = elapsed_ms(start);
        match &result {
            Ok(records) => tracing::debug!(
                requested = datasets.len(),
                found = records.len(),
                elapsed_ms,
                "catalog list"
            ),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "catalog list failed"),
        }
        result
    }

    async fn runs(&self, dataset: &str) -> Result<Vec<u64>, CatalogError> {
        let result = self.inner.runs(dataset).await;
        match &result {
            Ok(runs) => tracing::debug!(dataset, count = runs.len(), "catalog runs"),
            Err(e) => tracing::error!(dataset, error = %e, "catalog runs failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
