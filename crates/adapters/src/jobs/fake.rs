// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job manager for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobManager, JobManagerError, JobRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use rv_core::WorkflowStatus;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded job-manager call
#[derive(Debug, Clone, PartialEq)]
pub enum JobCall {
    Submit { spec: Value },
    SetStatus { workflow: String, status: String },
    Fetch { prep_id: String },
}

#[derive(Default)]
struct FakeJobState {
    calls: Vec<JobCall>,
    records: HashMap<String, Vec<JobRecord>>,
    next_workflow: u64,
    submit_error: Option<String>,
    set_status_error: Option<String>,
    fetch_error: Option<String>,
}

/// Fake job manager for testing.
///
/// Submitted specs become records under their `PrepID`, and `set_status`
/// appends to the named record's transitions, so `fetch` reflects both.
#[derive(Clone, Default)]
pub struct FakeJobManager {
    inner: Arc<Mutex<FakeJobState>>,
}

impl FakeJobManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records returned for `prep_id`.
    pub fn set_records(&self, prep_id: &str, records: Vec<JobRecord>) {
        self.inner
            .lock()
            .records
            .insert(prep_id.to_string(), records);
    }

    pub fn fail_submit(&self, message: &str) {
        self.inner.lock().submit_error = Some(message.to_string());
    }

    pub fn fail_set_status(&self, message: &str) {
        self.inner.lock().set_status_error = Some(message.to_string());
    }

    pub fn fail_fetch(&self, message: &str) {
        self.inner.lock().fetch_error = Some(message.to_string());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<JobCall> {
        self.inner.lock().calls.clone()
    }

    /// Job specs passed to `submit`, in order
    pub fn submitted(&self) -> Vec<Value> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                JobCall::Submit { spec } => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(workflow, status)` pairs passed to `set_status`, in order
    pub fn status_changes(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                JobCall::SetStatus { workflow, status } => Some((workflow.clone(), status.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl JobManager for FakeJobManager {
    async fn submit(&self, job_spec: &Value) -> Result<String, JobManagerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(JobCall::Submit {
            spec: job_spec.clone(),
        });
        if let Some(message) = &inner.submit_error {
            return Err(JobManagerError::Status {
                status: 500,
                body: message.clone(),
            });
        }
        inner.next_workflow += 1;
        let prep_id = job_spec
            .get("PrepID")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let name = format!("fake_{}_{}", prep_id, inner.next_workflow);
        let request_type = job_spec
            .get("RequestType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        inner.records.entry(prep_id.clone()).or_default().push(JobRecord {
            name: name.clone(),
            request_type,
            prep_id,
            output_datasets: Vec::new(),
            transitions: vec![WorkflowStatus {
                status: "new".to_string(),
                time: 0,
            }],
        });
        Ok(name)
    }

    async fn set_status(&self, workflow: &str, status: &str) -> Result<(), JobManagerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(JobCall::SetStatus {
            workflow: workflow.to_string(),
            status: status.to_string(),
        });
        if let Some(message) = &inner.set_status_error {
            return Err(JobManagerError::Request(message.clone()));
        }
        if let Some(record) = inner
            .records
            .values_mut()
            .flatten()
            .find(|r| r.name == workflow)
        {
            let time = record.transitions.last().map(|t| t.time + 1).unwrap_or(0);
            record.transitions.push(WorkflowStatus {
                status: status.to_string(),
                time,
            });
        }
        Ok(())
    }

    async fn fetch(&self, prep_id: &str) -> Result<Vec<JobRecord>, JobManagerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(JobCall::Fetch {
            prep_id: prep_id.to_string(),
        });
        if let Some(message) = &inner.fetch_error {
            return Err(JobManagerError::Request(message.clone()));
        }
        Ok(inner.records.get(prep_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
