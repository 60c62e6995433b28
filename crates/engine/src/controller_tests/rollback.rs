// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const ID: &str = "CMSSW_14_0_0__fall-TTbar-00001";
const RUNNING: &str = "pdmvserv_RVCMSSW_14_0_0TTbar_240101_000000_0001";
const IDLE: &str = "pdmvserv_RVCMSSW_14_0_0TTbar_240102_000000_0002";
const DEAD: &str = "pdmvserv_RVCMSSW_14_0_0TTbar_231230_000000_0003";

fn ids(ids: &[&str]) -> Vec<RelvalId> {
    ids.iter().map(|id| RelvalId::new(*id)).collect()
}

fn submitted_with_workflows(ctx: &TestContext) -> Relval {
    let mut rv = relval(ID, RelvalStatus::Submitted);
    rv.steps = vec![driver_step("RECO", "auto:phase1_2024", &["RECO"])];
    rv.steps[0].resolved_conditions = "140X_v1".to_string();
    rv.steps[0].config_id = "abc".to_string();
    rv.campaign_timestamp = 1_700_000_000;
    rv.output_datasets = vec!["/RelValTTbar/CMSSW_14_0_0-v1/RECO".to_string()];
    ctx.save(&rv);
    ctx.jobs.set_records(
        ID,
        vec![
            record(RUNNING, ID, &[], &[("new", 1), ("running-open", 2)]),
            record(IDLE, ID, &[], &[("new", 3), ("assignment-approved", 4)]),
            record(DEAD, ID, &[], &[("new", 5), ("rejected", 6)]),
        ],
    );
    rv
}

#[tokio::test]
async fn rollback_stops_active_workflows() {
    let ctx = setup();
    submitted_with_workflows(&ctx);

    let rv = ctx.ctl.rollback(&RelvalId::new(ID), USER).await.unwrap();

    assert_eq!(rv.status, RelvalStatus::Approved);
    assert_eq!(
        ctx.jobs.status_changes(),
        vec![
            (RUNNING.to_string(), "aborted".to_string()),
            (IDLE.to_string(), "rejected".to_string()),
        ]
    );
    assert!(rv.workflows.iter().all(|w| w.is_dead()));
    assert_eq!(rv.steps[0].config_id, "");
    assert_eq!(rv.steps[0].resolved_conditions, "140X_v1");
    assert_eq!(rv.campaign_timestamp, 0);
    assert!(rv.output_datasets.is_empty());
    assert_eq!(ctx.load(ID), rv);
}

#[tokio::test]
async fn rollback_fails_when_rejection_fails() {
    let ctx = setup();
    let before = submitted_with_workflows(&ctx);
    ctx.jobs.fail_set_status("forbidden");

    let err = ctx.ctl.rollback(&RelvalId::new(ID), USER).await.unwrap_err();

    assert!(matches!(err, ControllerError::ExternalService(_)));
    assert_eq!(ctx.load(ID), before);
}

#[tokio::test]
async fn rollback_twice_is_harmless() {
    let ctx = setup();
    submitted_with_workflows(&ctx);
    let id = RelvalId::new(ID);

    ctx.ctl.rollback(&id, USER).await.unwrap();
    let calls = ctx.jobs.status_changes().len();
    let again = ctx.ctl.rollback(&id, USER).await.unwrap();

    assert_eq!(again.status, RelvalStatus::Approved);
    assert_eq!(ctx.jobs.status_changes().len(), calls);
}

#[tokio::test]
async fn previous_status_walks_back_to_new() {
    let ctx = setup();
    submitted_with_workflows(&ctx);
    let id = ids(&[ID]);

    let first = ctx.ctl.previous_status(&id, USER).await;
    assert_eq!(first[0].1.as_ref().unwrap().status, RelvalStatus::Approved);

    let second = ctx.ctl.previous_status(&id, USER).await;
    let reset = second[0].1.as_ref().unwrap();
    assert_eq!(reset.status, RelvalStatus::New);
    assert_eq!(reset.steps[0].resolved_conditions, "");

    let third = ctx.ctl.previous_status(&id, USER).await;
    assert_eq!(third[0].1.as_ref().unwrap().status, RelvalStatus::New);
}

#[tokio::test]
async fn previous_status_isolates_failures() {
    let ctx = setup();
    ctx.input_chain("A-00001", RelvalStatus::Approved);
    ctx.input_chain("A-00002", RelvalStatus::Approved);
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire("A-00001", &LockOwner::generate(), "test")
        .unwrap();

    let results = ctx
        .ctl
        .previous_status(&ids(&["A-00001", "A-00002", "A-00001"]), USER)
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results[0].1, Err(ControllerError::AlreadyLocked(_))));
    assert_eq!(ctx.load("A-00002").status, RelvalStatus::New);
}

#[tokio::test]
async fn client_cannot_accept_a_submission() {
    let ctx = setup();
    let rv = ctx.input_chain(ID, RelvalStatus::Submitting);
    let owner = LockOwner::generate();

    let err = ctx
        .ctl
        .fire_as(
            &rv,
            Trigger::Accept,
            Origin::Client,
            USER,
            ctx.now(),
            &owner,
            Default::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::InvalidTransition(_)));
    assert_eq!(ctx.load(ID).status, RelvalStatus::Submitting);
}

#[tokio::test]
async fn recovery_rolls_back_orphaned_submissions() {
    let ctx = setup();
    let mut stuck = ctx.input_chain(ID, RelvalStatus::Submitting);
    stuck.campaign_timestamp = 1_700_000_000;
    stuck.steps[1].config_id = "half-done".to_string();
    ctx.save(&stuck);
    ctx.input_chain("A-00001", RelvalStatus::Submitted);

    let recovered = ctx.ctl.recover_stuck().await.unwrap();

    assert_eq!(recovered, ids(&[ID]));
    let rv = ctx.load(ID);
    assert_eq!(rv.status, RelvalStatus::Approved);
    assert_eq!(rv.campaign_timestamp, 0);
    assert_eq!(rv.steps[1].config_id, "");
    assert!(history_has(&rv, "submission", "interrupted"));
    assert_eq!(ctx.load("A-00001").status, RelvalStatus::Submitted);
}

#[tokio::test]
async fn recovery_stops_workflow_accepted_before_interruption() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Submitting);
    ctx.jobs.set_records(
        ID,
        vec![record(IDLE, ID, &[], &[("new", 1), ("assignment-approved", 2)])],
    );

    ctx.ctl.recover_stuck().await.unwrap();

    assert_eq!(
        ctx.jobs.status_changes(),
        vec![(IDLE.to_string(), "rejected".to_string())]
    );
    let rv = ctx.load(ID);
    assert_eq!(rv.status, RelvalStatus::Approved);
    assert_eq!(rv.workflows.len(), 1);
    assert_eq!(rv.workflows[0].name, IDLE);
    assert!(rv.workflows[0].is_dead());
}

#[tokio::test]
async fn recovery_rolls_back_when_job_manager_is_down() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Submitting);
    ctx.jobs.fail_fetch("connection refused");

    let recovered = ctx.ctl.recover_stuck().await.unwrap();

    assert_eq!(recovered, ids(&[ID]));
    let rv = ctx.load(ID);
    assert_eq!(rv.status, RelvalStatus::Approved);
    assert!(history_has(&rv, "submission", "interrupted"));
}

#[tokio::test]
async fn recovery_leaves_locked_submissions_alone() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Submitting);
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire(ID, &LockOwner::for_task(ID), "submission")
        .unwrap();

    let recovered = ctx.ctl.recover_stuck().await.unwrap();

    assert!(recovered.is_empty());
    assert_eq!(ctx.load(ID).status, RelvalStatus::Submitting);
}

#[tokio::test]
async fn polling_refreshes_unlocked_submitted_relvals() {
    let ctx = setup();
    submitted_with_workflows(&ctx);
    ctx.input_chain("A-00001", RelvalStatus::Submitted);
    ctx.input_chain("A-00002", RelvalStatus::Approved);
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire("A-00001", &LockOwner::generate(), "test")
        .unwrap();

    let refreshed = ctx.ctl.poll_submitted().await;

    assert_eq!(refreshed, 1);
    let rv = ctx.load(ID);
    assert_eq!(rv.workflows.len(), 3);
    assert_eq!(rv.workflows[0].name, DEAD);
    assert_eq!(rv.workflows[2].name, IDLE);
}

#[tokio::test]
async fn introspection_reports_locks_and_workers() {
    let ctx = setup();
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire(ID, &LockOwner::generate(), "inspection")
        .unwrap();

    let locks = ctx.ctl.lock_status();
    assert!(locks[ID].held);
    assert_eq!(locks[ID].info, "inspection");
    assert_eq!(ctx.ctl.worker_status().len(), 2);
    assert!(ctx.ctl.queued_names().is_empty());

    ctx.ctl.shutdown().await;
    ctx.input_chain("A-00001", RelvalStatus::Approved);
    let err = ctx.next_one("A-00001").await.unwrap_err();
    assert!(matches!(err, ControllerError::Queue(crate::queue::QueueError::Closed)));
    assert_eq!(ctx.load("A-00001").status, RelvalStatus::Approved);
}
