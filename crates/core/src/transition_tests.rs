// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::relval;
use proptest::prelude::*;
use RelvalStatus::*;

#[yare::parameterized(
    approve = { New, Trigger::Approve, Approved },
    submit = { Approved, Trigger::Submit, Submitting },
    accept = { Submitting, Trigger::Accept, Submitted },
    complete = { Submitted, Trigger::Complete, Done },
    archive = { Submitted, Trigger::Archive, Archived },
    late_recovery = { Archived, Trigger::Complete, Done },
    rollback_submitting = { Submitting, Trigger::Rollback, Approved },
    rollback_submitted = { Submitted, Trigger::Rollback, Approved },
    rollback_done = { Done, Trigger::Rollback, Approved },
    rollback_archived = { Archived, Trigger::Rollback, Approved },
    reset = { Approved, Trigger::Reset, New },
)]
fn table_edges(from: RelvalStatus, trigger: Trigger, to: RelvalStatus) {
    let edge = RelvalLifecycle::resolve(from, trigger).unwrap();
    assert_eq!(edge.to, to);
}

#[yare::parameterized(
    submit_new = { New, Trigger::Submit },
    approve_twice = { Approved, Trigger::Approve },
    resubmit_submitting = { Submitting, Trigger::Submit },
    complete_done = { Done, Trigger::Complete },
    archive_archived = { Archived, Trigger::Archive },
    reset_submitted = { Submitted, Trigger::Reset },
    rollback_new = { New, Trigger::Rollback },
)]
fn missing_edges_are_invalid(from: RelvalStatus, trigger: Trigger) {
    let err = RelvalLifecycle::resolve(from, trigger).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("cannot {} from status {}", trigger, from)
    );
}

#[test]
fn submitting_only_reachable_through_submit() {
    let entries: Vec<_> = RelvalLifecycle::table()
        .iter()
        .filter(|t| t.to == Submitting)
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].from, Approved);
    assert_eq!(entries[0].trigger, Trigger::Submit);
}

#[test]
fn rollbacks_are_idempotent_edges() {
    assert_eq!(
        RelvalLifecycle::resolve(Approved, Trigger::Rollback).map(|t| t.to),
        Ok(Approved)
    );
    assert_eq!(
        RelvalLifecycle::resolve(New, Trigger::Reset).map(|t| t.to),
        Ok(New)
    );
}

#[test]
fn triggers_from_submitted() {
    assert_eq!(
        RelvalLifecycle::triggers_from(Submitted),
        vec![Trigger::Complete, Trigger::Archive, Trigger::Rollback]
    );
}

#[test]
fn set_status_records_history() {
    let mut rv = relval("REL-00001", New);
    RelvalLifecycle::set_status(&mut rv, Approved, "alice", 1234);
    assert_eq!(rv.status, Approved);
    let entry = rv.history.last().unwrap();
    assert_eq!(entry.action, "status");
    assert_eq!(entry.value, serde_json::json!("approved"));
    assert_eq!(entry.user, "alice");
}

fn any_status() -> impl Strategy<Value = RelvalStatus> {
    proptest::sample::select(RelvalStatus::ALL.to_vec())
}

fn any_trigger() -> impl Strategy<Value = Trigger> {
    proptest::sample::select(Trigger::ALL.to_vec())
}

proptest! {
    #[test]
    fn resolve_is_total_over_the_table(from in any_status(), trigger in any_trigger()) {
        let in_table = RelvalLifecycle::table()
            .iter()
            .any(|t| t.from == from && t.trigger == trigger);
        prop_assert_eq!(RelvalLifecycle::resolve(from, trigger).is_ok(), in_table);
    }
}

#[test]
fn only_accept_is_internal() {
    let internal: Vec<_> = Trigger::ALL
        .into_iter()
        .filter(|t| RelvalLifecycle::is_internal(*t))
        .collect();
    assert_eq!(internal, vec![Trigger::Accept]);
}

#[test]
fn entity_id_is_the_prepid() {
    let rv = relval("REL-00003", New);
    assert_eq!(RelvalLifecycle::entity_id(&rv), "REL-00003");
}
