// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const ID: &str = "CMSSW_14_0_0__fall-TTbar-00001";
const WORKFLOW: &str = "pdmvserv_RVCMSSW_14_0_0TTbar_240101_000000_0001";
const DQM: &str = "/RelValTTbar/CMSSW_14_0_0-140X_v1-v1/DQMIO";

fn submitted_relval(ctx: &TestContext, status: RelvalStatus, statuses: &[(&str, u64)]) {
    let mut rv = relval(ID, status);
    rv.steps = vec![driver_step("HARVEST", "gt", &["DQMIO"])];
    rv.workflows = vec![Workflow::submitted(WORKFLOW)];
    ctx.save(&rv);
    ctx.jobs
        .set_records(ID, vec![record(WORKFLOW, ID, &[DQM], statuses)]);
}

#[tokio::test]
async fn completed_workflow_with_valid_outputs_is_done() {
    let ctx = setup();
    submitted_relval(
        &ctx,
        RelvalStatus::Submitted,
        &[("new", 100), ("running-open", 200), ("completed", 300)],
    );
    ctx.catalog.add_dataset(DQM, "VALID");

    let done = ctx.next_one(ID).await.unwrap();

    assert_eq!(done.status, RelvalStatus::Done);
    assert_eq!(done.output_datasets, vec![DQM.to_string()]);
    assert_eq!(done.workflows[0].output_datasets[0].access_type, "VALID");
    let last = done.history.last().unwrap();
    assert_eq!((last.action.as_str(), last.time), ("status", 300));
}

#[tokio::test]
async fn long_archived_workflow_is_archived() {
    let ctx = setup();
    submitted_relval(
        &ctx,
        RelvalStatus::Submitted,
        &[("new", 100), ("normal-archived", 200)],
    );
    ctx.catalog.add_dataset(DQM, "PRODUCTION");

    let archived = ctx.next_one(ID).await.unwrap();

    assert_eq!(archived.status, RelvalStatus::Archived);
    assert_eq!(archived.history.last().unwrap().time, 200);
}

#[tokio::test]
async fn recently_archived_workflow_waits() {
    let ctx = setup();
    let archived_at = ctx.now() - 3600;
    submitted_relval(
        &ctx,
        RelvalStatus::Submitted,
        &[("new", 100), ("normal-archived", archived_at)],
    );
    ctx.catalog.add_dataset(DQM, "PRODUCTION");

    match ctx.next_one(ID).await {
        Err(ControllerError::GuardFailed(reasons)) => {
            assert_eq!(reasons.len(), 3);
            assert_eq!(
                reasons[2],
                format!(
                    "cannot move {} to archived: {} is not archived long enough",
                    ID,
                    WORKFLOW
                )
            );
        }
        other => panic!("unexpected {:?}", other),
    }
    let rv = ctx.load(ID);
    assert_eq!(rv.status, RelvalStatus::Submitted);
    assert_eq!(rv.workflows[0].status_history.len(), 2);
}

#[tokio::test]
async fn archived_relval_becomes_done_once_outputs_validate() {
    let ctx = setup();
    submitted_relval(
        &ctx,
        RelvalStatus::Archived,
        &[("new", 100), ("completed", 150), ("normal-archived", 200)],
    );
    ctx.catalog.add_dataset(DQM, "PRODUCTION");
    assert!(matches!(
        ctx.next_one(ID).await,
        Err(ControllerError::GuardFailed(_))
    ));

    ctx.catalog.add_dataset(DQM, "VALID");
    let done = ctx.next_one(ID).await.unwrap();
    assert_eq!(done.status, RelvalStatus::Done);
}

#[tokio::test]
async fn running_workflow_is_not_done() {
    let ctx = setup();
    submitted_relval(
        &ctx,
        RelvalStatus::Submitted,
        &[("new", 100), ("running-open", 200)],
    );
    ctx.catalog.add_dataset(DQM, "VALID");

    let err = ctx.next_one(ID).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "cannot move {} to done: {} is not yet completed",
            ID,
            WORKFLOW
        )
    );
}

#[tokio::test]
async fn job_manager_outage_is_an_external_service_error() {
    let ctx = setup();
    submitted_relval(&ctx, RelvalStatus::Submitted, &[("new", 100)]);
    ctx.jobs.fail_fetch("timeout");

    let err = ctx.next_one(ID).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "external service error: job manager: request failed: timeout"
    );
}

#[tokio::test]
async fn done_relval_has_no_next_status() {
    let ctx = setup();
    ctx.save(&relval(ID, RelvalStatus::Done));

    let err = ctx.next_one(ID).await.unwrap_err();

    assert_eq!(err.to_string(), "cannot next from status done");
}
