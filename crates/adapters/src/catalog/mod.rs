// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dataset-catalog adapters

mod rest;

pub use rest::RestDatasetCatalog;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CatalogCall, FakeDatasetCatalog};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// A dataset known to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub name: String,
    /// e.g. `VALID`, `PRODUCTION`, `INVALID`
    pub access_type: String,
}

/// Adapter for the dataset catalog
#[async_trait]
pub trait DatasetCatalog: Clone + Send + Sync + 'static {
    /// Look up the given datasets. Unknown datasets are simply absent.
    async fn list(&self, datasets: &[String]) -> Result<Vec<DatasetRecord>, CatalogError>;

    /// Run numbers present in `dataset`.
    async fn runs(&self, dataset: &str) -> Result<Vec<u64>, CatalogError>;
}
