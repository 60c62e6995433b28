// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Notification, NotifyAdapter, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FakeNotifyState {
    sent: Vec<Notification>,
    error: Option<String>,
}

/// Fake notification adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    inner: Arc<Mutex<FakeNotifyState>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all notifications passed to `notify`, including failed ones
    pub fn sent(&self) -> Vec<Notification> {
        self.inner.lock().sent.clone()
    }

    /// Make every subsequent `notify` fail.
    pub fn fail(&self, message: &str) {
        self.inner.lock().error = Some(message.to_string());
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock();
        inner.sent.push(notification.clone());
        match &inner.error {
            Some(message) => Err(NotifyError::SendFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
