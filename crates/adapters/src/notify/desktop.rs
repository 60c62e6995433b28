// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapter using notify-rust.

use super::{Notification, NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// Longest body shown in a desktop popup; the rest is elided.
const MAX_BODY_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn popup_body(notification: &Notification) -> String {
    let mut body: String = notification.body.chars().take(MAX_BODY_CHARS).collect();
    if notification.body.chars().count() > MAX_BODY_CHARS {
        body.push_str("...");
    }
    if let Some(attachment) = &notification.attachment {
        body.push_str(&format!("\n[attachment: {}]", attachment.file_name));
    }
    body
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let subject = notification.subject.clone();
        let body = popup_body(notification);
        let recipients = notification.recipients.join(",");
        // show() is synchronous; run it on the blocking pool and don't wait.
        tokio::task::spawn_blocking(move || {
            tracing::info!(%subject, %recipients, "sending desktop notification");
            match notify_rust::Notification::new()
                .summary(&subject)
                .body(&body)
                .show()
            {
                Ok(_) => tracing::info!(%subject, "desktop notification sent"),
                Err(e) => tracing::warn!(%subject, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "desktop_tests.rs"]
mod tests;
