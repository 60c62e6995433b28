// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence contract for RelVal documents.

use crate::query::{Page, Query};
use crate::snapshot::SnapshotError;
use rv_core::{Relval, RelvalId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("relval not found: {0}")]
    NotFound(RelvalId),
}

/// Document store holding one document per RelVal id.
///
/// Deleted documents are tombstoned: they stay in the store (so their ids
/// are never reissued) but `get` and `query` do not return them.
pub trait RelvalStore: Clone + Send + Sync + 'static {
    /// Fetch a live document.
    fn get(&self, id: &RelvalId) -> Result<Option<Relval>, StoreError>;

    /// Insert or replace a document.
    fn save(&self, relval: &Relval) -> Result<(), StoreError>;

    /// Live documents matching `query`, plus the total match count.
    fn query(&self, query: &Query) -> Result<Page, StoreError>;

    /// Tombstone a document.
    fn delete(&self, id: &RelvalId) -> Result<(), StoreError>;

    /// Highest serial ever issued under `namespace`, deleted documents included.
    fn max_serial(&self, namespace: &str) -> Result<u32, StoreError>;
}
