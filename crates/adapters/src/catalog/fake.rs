// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake dataset catalog for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CatalogError, DatasetCatalog, DatasetRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded catalog call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    List { datasets: Vec<String> },
    Runs { dataset: String },
}

#[derive(Default)]
struct FakeCatalogState {
    calls: Vec<CatalogCall>,
    datasets: HashMap<String, String>,
    runs: HashMap<String, Vec<u64>>,
    error: Option<String>,
}

/// Fake dataset catalog for testing
#[derive(Clone, Default)]
pub struct FakeDatasetCatalog {
    inner: Arc<Mutex<FakeCatalogState>>,
}

impl FakeDatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dataset` with the given access type.
    pub fn add_dataset(&self, dataset: &str, access_type: &str) {
        self.inner
            .lock()
            .datasets
            .insert(dataset.to_string(), access_type.to_string());
    }

    /// Register the runs present in `dataset`.
    pub fn set_runs(&self, dataset: &str, runs: Vec<u64>) {
        self.inner.lock().runs.insert(dataset.to_string(), runs);
    }

    /// Make every subsequent call fail with `message`.
    pub fn fail(&self, message: &str) {
        self.inner.lock().error = Some(message.to_string());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl DatasetCatalog for FakeDatasetCatalog {
    async fn list(&self, datasets: &[String]) -> Result<Vec<DatasetRecord>, CatalogError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::List {
            datasets: datasets.to_vec(),
        });
        if let Some(message) = &inner.error {
            return Err(CatalogError::Request(message.clone()));
        }
        Ok(datasets
            .iter()
            .filter_map(|name| {
                inner.datasets.get(name).map(|access_type| DatasetRecord {
                    name: name.clone(),
                    access_type: access_type.clone(),
                })
            })
            .collect())
    }

    async fn runs(&self, dataset: &str) -> Result<Vec<u64>, CatalogError> {
        let mut inner = self.inner.lock();
        inner.calls.push(CatalogCall::Runs {
            dataset: dataset.to_string(),
        });
        if let Some(message) = &inner.error {
            return Err(CatalogError::Request(message.clone()));
        }
        Ok(inner.runs.get(dataset).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
