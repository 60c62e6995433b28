// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory document store with optional snapshot persistence.

use crate::query::{Page, Query};
use crate::snapshot::Snapshot;
use crate::store::{RelvalStore, StoreError};
use parking_lot::Mutex;
use rv_core::{Relval, RelvalId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Documents {
    docs: BTreeMap<RelvalId, Relval>,
    path: Option<PathBuf>,
}

impl Documents {
    /// Write the full document set if this store is file-backed.
    fn checkpoint(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            Snapshot::new(self.docs.values().cloned().collect()).save(path)?;
        }
        Ok(())
    }
}

/// Document store kept in memory.
///
/// When opened on a path, every mutation rewrites the snapshot file before
/// returning, so a successful `save` is durable.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Documents>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl MemoryStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Documents {
                docs: BTreeMap::new(),
                path: None,
            })),
        }
    }

    /// Open a file-backed store, loading the snapshot at `path` if present.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let docs = match Snapshot::load(path)? {
            Some(snapshot) => {
                tracing::info!(
                    path = %path.display(),
                    count = snapshot.relvals.len(),
                    created_at = %snapshot.created_at,
                    "loaded snapshot"
                );
                snapshot
                    .relvals
                    .into_iter()
                    .map(|r| (r.id.clone(), r))
                    .collect()
            }
            None => BTreeMap::new(),
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(Documents {
                docs,
                path: Some(path.to_path_buf()),
            })),
        })
    }

    /// Number of documents, tombstones included.
    pub fn len(&self) -> usize {
        self.inner.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RelvalStore for MemoryStore {
    fn get(&self, id: &RelvalId) -> Result<Option<Relval>, StoreError> {
        Ok(self
            .inner
            .lock()
            .docs
            .get(id)
            .filter(|r| !r.deleted)
            .cloned())
    }

    fn save(&self, relval: &Relval) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let previous = inner.docs.insert(relval.id.clone(), relval.clone());
        if let Err(e) = inner.checkpoint() {
            // Keep memory consistent with disk
            match previous {
                Some(prev) => inner.docs.insert(relval.id.clone(), prev),
                None => inner.docs.remove(&relval.id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn query(&self, query: &Query) -> Result<Page, StoreError> {
        Ok(query.apply(self.inner.lock().docs.values()))
    }

    fn delete(&self, id: &RelvalId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.docs.get_mut(id) {
            Some(doc) if !doc.deleted => doc.deleted = true,
            _ => return Err(StoreError::NotFound(id.clone())),
        }
        if let Err(e) = inner.checkpoint() {
            if let Some(doc) = inner.docs.get_mut(id) {
                doc.deleted = false;
            }
            return Err(e);
        }
        Ok(())
    }

    fn max_serial(&self, namespace: &str) -> Result<u32, StoreError> {
        Ok(self
            .inner
            .lock()
            .docs
            .keys()
            .filter_map(|id| id.split())
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, serial)| serial)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
