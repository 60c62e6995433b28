// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock ownership.
//!
//! Named locks are reentrant per owner rather than per thread: an async task
//! may resume on any worker thread, so the execution context that holds a
//! lock is identified explicitly. Each request handler or queued task mints
//! one owner and passes it to every acquisition it makes.

crate::define_id! {
    /// Identity of the execution context holding a named lock.
    pub struct LockOwner;
}

impl LockOwner {
    /// Mint a fresh owner identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Owner identity for a background task, derived from the task name.
    ///
    /// The random suffix keeps two executions of the same task name distinct.
    pub fn for_task(task_name: &str) -> Self {
        Self(format!("task:{}:{}", task_name, uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
#[path = "owner_tests.rs"]
mod tests;
