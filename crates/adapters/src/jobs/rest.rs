// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP job manager client

use super::{JobManager, JobManagerError, JobRecord};
use crate::http::{build_client, HttpConfig};
use async_trait::async_trait;
use rv_core::WorkflowStatus;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const REQUEST_PATH: &str = "/reqmgr2/data/request";

/// Job manager speaking the request-manager REST API
#[derive(Clone)]
pub struct RestJobManager {
    client: reqwest::Client,
    config: Arc<HttpConfig>,
}

impl RestJobManager {
    pub fn new(config: HttpConfig) -> Result<Self, JobManagerError> {
        let client = build_client(&config).map_err(JobManagerError::Request)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, JobManagerError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| JobManagerError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JobManagerError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(JobManagerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| JobManagerError::UnexpectedResponse(e.to_string()))
    }
}

#[async_trait]
impl JobManager for RestJobManager {
    async fn submit(&self, job_spec: &Value) -> Result<String, JobManagerError> {
        let url = self.config.url(REQUEST_PATH);
        let body = self.send(self.client.post(url).json(job_spec)).await?;
        parse_submit_response(&body)
    }

    async fn set_status(&self, workflow: &str, status: &str) -> Result<(), JobManagerError> {
        let url = self.config.url(&format!("{}/{}", REQUEST_PATH, workflow));
        self.send(
            self.client
                .put(url)
                .json(&json!({ "RequestStatus": status })),
        )
        .await?;
        Ok(())
    }

    async fn fetch(&self, prep_id: &str) -> Result<Vec<JobRecord>, JobManagerError> {
        if prep_id.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.config.url(REQUEST_PATH);
        let body = self
            .send(self.client.get(url).query(&[("prep_id", prep_id)]))
            .await?;
        parse_fetch_response(body)
    }
}

/// Extract the created workflow name from `{"result": [{"request": name}]}`.
pub(crate) fn parse_submit_response(body: &Value) -> Result<String, JobManagerError> {
    body.get("result")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("request"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| JobManagerError::UnexpectedResponse(format!("no request name in {}", body)))
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    result: Vec<BTreeMap<String, WireRecord>>,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "RequestName")]
    name: String,
    #[serde(rename = "RequestType", default)]
    request_type: String,
    #[serde(rename = "PrepID", default)]
    prep_id: String,
    #[serde(rename = "OutputDatasets", default)]
    output_datasets: Vec<String>,
    #[serde(rename = "RequestTransition", default)]
    transitions: Vec<WireTransition>,
}

#[derive(Deserialize)]
struct WireTransition {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "UpdateTime", default)]
    time: u64,
}

/// Flatten `{"result": [{name: record, ...}, ...]}` into records.
pub(crate) fn parse_fetch_response(body: Value) -> Result<Vec<JobRecord>, JobManagerError> {
    let response: FetchResponse = serde_json::from_value(body)
        .map_err(|e| JobManagerError::UnexpectedResponse(e.to_string()))?;
    Ok(response
        .result
        .into_iter()
        .flat_map(BTreeMap::into_values)
        .map(|w| JobRecord {
            name: w.name,
            request_type: w.request_type,
            prep_id: w.prep_id,
            output_datasets: w.output_datasets,
            transitions: w
                .transitions
                .into_iter()
                .map(|t| WorkflowStatus {
                    status: t.status,
                    time: t.time,
                })
                .collect(),
        })
        .collect())
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
