// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notification adapter.

use super::{Notification, NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// Drops every notification. Selected by `[notify] backend = "none"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifyAdapter;

impl NoOpNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::debug!(subject = %notification.subject, "notification discarded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
