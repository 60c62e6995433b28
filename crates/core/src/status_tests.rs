// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    new = { RelvalStatus::New, "new" },
    approved = { RelvalStatus::Approved, "approved" },
    submitting = { RelvalStatus::Submitting, "submitting" },
    submitted = { RelvalStatus::Submitted, "submitted" },
    done = { RelvalStatus::Done, "done" },
    archived = { RelvalStatus::Archived, "archived" },
)]
fn status_text_forms_agree(status: RelvalStatus, text: &str) {
    assert_eq!(status.to_string(), text);
    assert_eq!(text.parse::<RelvalStatus>().unwrap(), status);
    assert_eq!(
        serde_json::to_string(&status).unwrap(),
        format!("\"{}\"", text)
    );
}

#[test]
fn unknown_status_is_rejected() {
    let err = "announced".parse::<RelvalStatus>().unwrap_err();
    assert_eq!(err.to_string(), "unknown status: announced");
}

#[test]
fn only_submitting_is_transient() {
    let transient: Vec<_> = RelvalStatus::ALL
        .into_iter()
        .filter(RelvalStatus::is_transient)
        .collect();
    assert_eq!(transient, vec![RelvalStatus::Submitting]);
}

#[test]
fn only_accept_is_internal() {
    let internal: Vec<_> = Trigger::ALL
        .into_iter()
        .filter(Trigger::is_internal)
        .collect();
    assert_eq!(internal, vec![Trigger::Accept]);
}
