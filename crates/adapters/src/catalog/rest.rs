// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP dataset catalog client

use super::{CatalogError, DatasetCatalog, DatasetRecord};
use crate::http::{build_client, HttpConfig};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const READER_PATH: &str = "/dbs/prod/global/DBSReader";

/// Dataset catalog speaking the bookkeeping-reader REST API
#[derive(Clone)]
pub struct RestDatasetCatalog {
    client: reqwest::Client,
    config: Arc<HttpConfig>,
}

impl RestDatasetCatalog {
    pub fn new(config: HttpConfig) -> Result<Self, CatalogError> {
        let client = build_client(&config).map_err(CatalogError::Request)?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, CatalogError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        serde_json::from_str(&body).map_err(|e| CatalogError::UnexpectedResponse(e.to_string()))
    }
}

#[async_trait]
impl DatasetCatalog for RestDatasetCatalog {
    async fn list(&self, datasets: &[String]) -> Result<Vec<DatasetRecord>, CatalogError> {
        if datasets.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.config.url(&format!("{}/datasetlist", READER_PATH));
        let body = json!({
            "dataset": datasets,
            "detail": 1,
            "dataset_access_type": "*",
        });
        let response = self.send(self.client.post(url).json(&body)).await?;
        parse_datasetlist(response)
    }

    async fn runs(&self, dataset: &str) -> Result<Vec<u64>, CatalogError> {
        if dataset.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.config.url(&format!("{}/runs", READER_PATH));
        let response = self
            .send(self.client.get(url).query(&[("dataset", dataset)]))
            .await?;
        parse_runs(response)
    }
}

#[derive(Deserialize)]
struct WireDataset {
    dataset: String,
    #[serde(default)]
    dataset_access_type: String,
}

pub(crate) fn parse_datasetlist(body: Value) -> Result<Vec<DatasetRecord>, CatalogError> {
    let rows: Vec<WireDataset> = serde_json::from_value(body)
        .map_err(|e| CatalogError::UnexpectedResponse(e.to_string()))?;
    Ok(rows
        .into_iter()
        .map(|row| DatasetRecord {
            name: row.dataset,
            access_type: row.dataset_access_type,
        })
        .collect())
}

/// The reader reports `run_num` either as one number or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum RunNumbers {
    One(u64),
    Many(Vec<u64>),
}

#[derive(Deserialize)]
struct WireRuns {
    run_num: RunNumbers,
}

pub(crate) fn parse_runs(body: Value) -> Result<Vec<u64>, CatalogError> {
    let rows: Vec<WireRuns> = serde_json::from_value(body)
        .map_err(|e| CatalogError::UnexpectedResponse(e.to_string()))?;
    let mut runs = Vec::new();
    for row in rows {
        match row.run_num {
            RunNumbers::One(run) => runs.push(run),
            RunNumbers::Many(many) => runs.extend(many),
        }
    }
    Ok(runs)
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
