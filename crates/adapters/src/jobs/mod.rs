// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-management service adapters

mod rest;

pub use rest::RestJobManager;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobManager, JobCall};

use async_trait::async_trait;
use rv_core::WorkflowStatus;
use thiserror::Error;

/// Errors from job-manager operations
#[derive(Debug, Error)]
pub enum JobManagerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// A workflow as reported by the job manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub request_type: String,
    pub prep_id: String,
    pub output_datasets: Vec<String>,
    /// Status transitions, oldest first
    pub transitions: Vec<WorkflowStatus>,
}

/// Adapter for the remote job-management service
#[async_trait]
pub trait JobManager: Clone + Send + Sync + 'static {
    /// Create a workflow from a job spec; returns the workflow name.
    async fn submit(&self, job_spec: &serde_json::Value) -> Result<String, JobManagerError>;

    /// Move a workflow to `status`.
    async fn set_status(&self, workflow: &str, status: &str) -> Result<(), JobManagerError>;

    /// All workflows created for `prep_id`.
    async fn fetch(&self, prep_id: &str) -> Result<Vec<JobRecord>, JobManagerError>;
}
