// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn short_body_is_kept() {
    let n = Notification::new("Submission succeeded", "wf_1 submitted");
    assert_eq!(popup_body(&n), "wf_1 submitted");
}

#[test]
fn long_body_is_elided() {
    let n = Notification::new("Submission failed", "x".repeat(MAX_BODY_CHARS + 10));
    let body = popup_body(&n);
    assert_eq!(body.len(), MAX_BODY_CHARS + 3);
    assert!(body.ends_with("..."));
}

#[test]
fn attachment_is_mentioned() {
    let n = Notification::new("Submission failed", "see log")
        .with_attachment("REL-00001.txt", "stderr");
    assert_eq!(popup_body(&n), "see log\n[attachment: REL-00001.txt]");
}
