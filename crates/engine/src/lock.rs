// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, owner-reentrant locks.
//!
//! Locks are created lazily on first use and reused for the same key. Each
//! entry records who holds it, how many times, and a free-text reason. When
//! the registry grows past its threshold, entries that are neither held nor
//! awaited are dropped, except the one just accessed.

use parking_lot::Mutex;
use rv_core::LockOwner;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

/// Default registry size above which idle entries are pruned.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 100;

/// Non-blocking acquisition found the key held by another owner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key} is locked: operation already in progress")]
pub struct AlreadyLocked {
    pub key: String,
}

/// Point-in-time view of one lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    pub held: bool,
    pub info: String,
    pub owner: Option<LockOwner>,
    pub depth: u32,
}

#[derive(Default)]
struct Hold {
    owner: Option<LockOwner>,
    depth: u32,
    info: String,
}

#[derive(Default)]
struct LockEntry {
    hold: Mutex<Hold>,
    released: Notify,
}

impl LockEntry {
    fn try_take(&self, owner: &LockOwner, info: &str) -> bool {
        let mut hold = self.hold.lock();
        match &hold.owner {
            None => {
                hold.owner = Some(owner.clone());
                hold.depth = 1;
                hold.info = info.to_string();
                true
            }
            Some(current) if current == owner => {
                hold.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    fn is_held(&self) -> bool {
        self.hold.lock().owner.is_some()
    }
}

/// Registry of named locks shared by request handlers and workers
#[derive(Clone)]
pub struct LockRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<LockEntry>>>>,
    prune_threshold: usize,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PRUNE_THRESHOLD)
    }
}

impl LockRegistry {
    pub fn new(prune_threshold: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            prune_threshold,
        }
    }

    /// Get or create the entry for `key`, pruning idle entries when large.
    fn entry(&self, key: &str) -> Arc<LockEntry> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_default().clone();
        if entries.len() > self.prune_threshold {
            let before = entries.len();
            // An entry is in use while held or while some caller holds its Arc
            entries.retain(|k, e| k == key || Arc::strong_count(e) > 1 || e.is_held());
            tracing::debug!(
                pruned = before - entries.len(),
                remaining = entries.len(),
                "pruned lock registry"
            );
        }
        entry
    }

    /// Acquire `key` for `owner`, waiting while another owner holds it.
    ///
    /// Reentrant: an owner that already holds the key gets a nested guard
    /// immediately. The key is free once every guard has been dropped.
    pub async fn acquire(&self, key: &str, owner: &LockOwner, info: &str) -> LockGuard {
        let entry = self.entry(key);
        loop {
            let released = entry.released.notified();
            if entry.try_take(owner, info) {
                drop(released);
                return LockGuard {
                    key: key.to_string(),
                    entry,
                };
            }
            tracing::trace!(key, owner = %owner, "waiting for lock");
            released.await;
        }
    }

    /// Acquire `key` for `owner` or fail at once if another owner holds it.
    pub fn try_acquire(
        &self,
        key: &str,
        owner: &LockOwner,
        info: &str,
    ) -> Result<LockGuard, AlreadyLocked> {
        let entry = self.entry(key);
        if entry.try_take(owner, info) {
            Ok(LockGuard {
                key: key.to_string(),
                entry,
            })
        } else {
            Err(AlreadyLocked {
                key: key.to_string(),
            })
        }
    }

    /// Whether any owner currently holds `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.is_held())
    }

    /// Snapshot of every registered lock.
    pub fn status(&self) -> BTreeMap<String, LockStatus> {
        self.entries
            .lock()
            .iter()
            .map(|(key, entry)| {
                let hold = entry.hold.lock();
                (
                    key.clone(),
                    LockStatus {
                        held: hold.owner.is_some(),
                        info: hold.info.clone(),
                        owner: hold.owner.clone(),
                        depth: hold.depth,
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped hold on a named lock; dropping it releases one level.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    key: String,
    entry: Arc<LockEntry>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let freed = {
            let mut hold = self.entry.hold.lock();
            hold.depth = hold.depth.saturating_sub(1);
            if hold.depth == 0 {
                hold.owner = None;
                true
            } else {
                false
            }
        };
        if freed {
            self.entry.released.notify_one();
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
