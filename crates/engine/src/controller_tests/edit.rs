// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn draft() -> Relval {
    let mut rv = relval("", RelvalStatus::Submitted);
    rv.steps = vec![driver_step("GEN", "auto:phase1_2024", &["GEN-SIM"])];
    rv.steps[0].config_id = "stale".to_string();
    rv.campaign_timestamp = 99;
    rv
}

#[tokio::test]
async fn create_mints_sequential_ids() {
    let ctx = setup();
    let first = ctx.ctl.create(draft(), USER).await.unwrap();
    let second = ctx.ctl.create(draft(), USER).await.unwrap();

    assert_eq!(first.id, "CMSSW_14_0_0__fall-TTbar-00001");
    assert_eq!(second.id, "CMSSW_14_0_0__fall-TTbar-00002");
    assert_eq!(first.status, RelvalStatus::New);
    assert_eq!(first.campaign_timestamp, 0);
    assert_eq!(first.steps[0].config_id, "");
    assert_eq!(first.history.len(), 1);
    assert_eq!(first.history[0].action, "created");
    assert_eq!(first.history[0].user, USER);
    assert_eq!(ctx.load(second.id.as_str()), second);
}

#[tokio::test]
async fn deleted_serials_are_not_reissued() {
    let ctx = setup();
    let first = ctx.ctl.create(draft(), USER).await.unwrap();
    ctx.ctl.delete(&first.id, USER).unwrap();

    let next = ctx.ctl.create(draft(), USER).await.unwrap();
    assert_eq!(next.id, "CMSSW_14_0_0__fall-TTbar-00002");
}

#[tokio::test]
async fn exhausted_namespace_refuses_to_mint() {
    let ctx = setup();
    let mut last = draft();
    last.id = RelvalId::new("CMSSW_14_0_0__fall-TTbar-4294967295");
    ctx.ctl.create(last, USER).await.unwrap();

    let err = ctx.ctl.create(draft(), USER).await.unwrap_err();
    assert!(
        matches!(&err, ControllerError::InvalidUpdate(msg) if msg.contains("no serials left")),
        "unexpected error: {err}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_ids() {
    let ctx = setup();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctl = ctx.ctl.clone();
            tokio::spawn(async move { ctl.create(draft(), USER).await })
        })
        .collect();
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id.to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(ids[7], "CMSSW_14_0_0__fall-TTbar-00008");
}

#[tokio::test]
async fn explicit_ids_are_kept_once() {
    let ctx = setup();
    let mut explicit = draft();
    explicit.id = RelvalId::new("REL-2024-00007");
    let created = ctx.ctl.create(explicit.clone(), USER).await.unwrap();
    assert_eq!(created.id, "REL-2024-00007");

    let again = ctx.ctl.create(explicit, USER).await;
    assert!(matches!(again, Err(ControllerError::AlreadyExists(id)) if id == "REL-2024-00007"));

    let mut older = draft();
    older.id = RelvalId::new("REL-2024-00003");
    assert!(matches!(
        ctx.ctl.create(older, USER).await,
        Err(ControllerError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn create_requires_a_release() {
    let ctx = setup();
    let mut rv = draft();
    rv.cmssw_release.clear();
    assert!(matches!(
        ctx.ctl.create(rv, USER).await,
        Err(ControllerError::InvalidUpdate(_))
    ));
}

#[tokio::test]
async fn update_changes_editable_fields_and_records_them() {
    let ctx = setup();
    let mut rv = ctx.ctl.create(draft(), USER).await.unwrap();
    rv.label = "pu".to_string();
    rv.notes = "rerun with new GT".to_string();
    rv.memory_mb = 4000;

    let updated = ctx.ctl.update(&rv, "editor").unwrap();
    assert_eq!(updated.label, "pu");
    assert_eq!(updated.memory_mb, 4000);
    let last = updated.history.last().unwrap();
    assert_eq!(last.action, "update");
    assert_eq!(last.user, "editor");
    assert_eq!(last.value, "label, memory_mb, notes");
}

#[tokio::test]
async fn update_without_changes_adds_no_history() {
    let ctx = setup();
    let rv = ctx.ctl.create(draft(), USER).await.unwrap();
    let updated = ctx.ctl.update(&rv, USER).unwrap();
    assert_eq!(updated.history.len(), 1);
}

#[tokio::test]
async fn only_notes_and_ticket_change_after_new() {
    let ctx = setup();
    let rv = ctx.input_chain("CMSSW_14_0_0__fall-TTbar-00001", RelvalStatus::Approved);

    let mut notes = rv.clone();
    notes.notes = "looked at it".to_string();
    notes.jira_ticket = "PDMV-1".to_string();
    let updated = ctx.ctl.update(&notes, USER).unwrap();
    assert_eq!(updated.jira_ticket, "PDMV-1");

    let mut label = updated.clone();
    label.label = "late".to_string();
    let err = ctx.ctl.update(&label, USER).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid update: label can only be changed in status new"
    );
}

#[tokio::test]
async fn immutable_fields_are_refused() {
    let ctx = setup();
    let created = ctx.ctl.create(draft(), USER).await.unwrap();
    let edits: [(&str, fn(&mut Relval)); 4] = [
        ("status", |rv| rv.status = RelvalStatus::Done),
        ("history", |rv| rv.history.clear()),
        ("campaign_timestamp", |rv| rv.campaign_timestamp = 5),
        ("output_datasets", |rv| rv.output_datasets.push("/A/B/RECO".to_string())),
    ];
    for (field, edit) in edits {
        let mut rv = created.clone();
        edit(&mut rv);
        let err = ctx.ctl.update(&rv, USER).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("invalid update: {} cannot be changed", field)
        );
    }
}

#[tokio::test]
async fn update_fails_fast_when_locked() {
    let ctx = setup();
    let rv = ctx.ctl.create(draft(), USER).await.unwrap();
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire(rv.id.as_str(), &LockOwner::generate(), "test")
        .unwrap();
    assert!(matches!(
        ctx.ctl.update(&rv, USER),
        Err(ControllerError::AlreadyLocked(key)) if key == rv.id.as_str()
    ));
}

#[tokio::test]
async fn delete_tombstones_new_relvals() {
    let ctx = setup();
    let rv = ctx.ctl.create(draft(), USER).await.unwrap();
    ctx.ctl.delete(&rv.id, USER).unwrap();

    assert!(matches!(ctx.ctl.get(&rv.id), Err(ControllerError::NotFound(_))));
    assert_eq!(ctx.ctl.query(&rv_storage::Query::all()).unwrap().total, 0);
}

#[tokio::test]
async fn delete_refuses_relvals_with_remote_state() {
    let ctx = setup();
    let approved = ctx.input_chain("CMSSW_14_0_0__fall-TTbar-00001", RelvalStatus::Approved);
    let err = ctx.ctl.delete(&approved.id, USER).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot delete CMSSW_14_0_0__fall-TTbar-00001: status is approved"
    );

    let mut with_workflows = relval("CMSSW_14_0_0__fall-TTbar-00002", RelvalStatus::New);
    with_workflows.workflows = vec![Workflow::submitted("old_wf")];
    ctx.save(&with_workflows);
    assert!(matches!(
        ctx.ctl.delete(&with_workflows.id, USER),
        Err(ControllerError::DeleteRefused { .. })
    ));
}
