// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::scripts::{GENERATE_SCRIPT, UPLOAD_SCRIPT};

const ID: &str = "REL-2024-00007";

fn submitted(relval: &Relval) -> bool {
    relval.status == RelvalStatus::Submitted
}

fn submission_recorded(relval: &Relval) -> bool {
    relval.history.iter().any(|h| h.action == "submission")
}

#[tokio::test]
async fn submit_stamps_campaign_and_rejects_a_second_request() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.upload_succeeds(&[("step_2_cfg", "abc123")]);
    ctx.remote.set_execute_delay(Duration::from_millis(100));

    let submitting = ctx.next_one(ID).await.unwrap();
    assert_eq!(submitting.status, RelvalStatus::Submitting);
    assert_eq!(submitting.campaign_timestamp, ctx.now());

    let second = ctx.next_one(ID).await.unwrap_err();
    assert!(matches!(second, ControllerError::AlreadyLocked(key) if key == ID));

    ctx.wait_for(ID, submitted).await;
    ctx.settle().await;
    assert_eq!(ctx.jobs.submitted().len(), 1);
}

#[tokio::test]
async fn campaign_timestamp_is_shared_inside_the_window() {
    let ctx = setup();
    let mut recent = relval("CMSSW_14_0_0__fall-TTbar-00001", RelvalStatus::Submitted);
    recent.campaign_timestamp = ctx.now() - 1800;
    ctx.save(&recent);
    let mut other_batch = relval("CMSSW_14_0_0__spring-TTbar-00001", RelvalStatus::Submitted);
    other_batch.batch_name = "spring".to_string();
    other_batch.campaign_timestamp = ctx.now() - 10;
    ctx.save(&other_batch);
    ctx.input_chain(ID, RelvalStatus::Approved);

    let submitting = ctx.next_one(ID).await.unwrap();

    assert_eq!(submitting.campaign_timestamp, ctx.now() - 1800);
    ctx.settle().await;
}

#[tokio::test]
async fn stale_campaign_timestamp_is_replaced() {
    let ctx = setup();
    let mut old = relval("CMSSW_14_0_0__fall-TTbar-00001", RelvalStatus::Done);
    old.campaign_timestamp = ctx.now() - 7200;
    ctx.save(&old);
    ctx.input_chain(ID, RelvalStatus::Approved);

    let submitting = ctx.next_one(ID).await.unwrap();

    assert_eq!(submitting.campaign_timestamp, ctx.now());
    ctx.settle().await;
}

#[tokio::test]
async fn successful_submission_reaches_submitted() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.upload_succeeds(&[("step_2_cfg", "abc123")]);

    ctx.next_one(ID).await.unwrap();
    ctx.wait_for(ID, submitted).await;
    ctx.settle().await;
    let rv = ctx.load(ID);

    let workflow = format!("fake_{}_1", ID);
    assert_eq!(rv.steps[1].config_id, "abc123");
    assert_eq!(rv.workflows.len(), 1);
    assert_eq!(rv.workflows[0].name, workflow);
    assert_eq!(
        rv.workflows[0].last_status(),
        Some("assignment-approved")
    );
    assert!(history_has(&rv, "submission", "succeeded"));
    assert!(history_has(&rv, "status", "submitted"));

    let spec = &ctx.jobs.submitted()[0];
    assert_eq!(spec["PrepID"], ID);
    assert_eq!(spec["Task1"]["ConfigCacheID"], "abc123");
    assert_eq!(spec["Task1"]["InputDataset"], RAW);
    assert_eq!(
        ctx.jobs.status_changes(),
        vec![(workflow.clone(), "assignment-approved".to_string())]
    );

    let workspace = format!("rvt-submissions/{}", ID);
    let generate = ctx
        .remote
        .uploaded(&format!("{}/{}", workspace, GENERATE_SCRIPT))
        .unwrap();
    assert!(generate.contains("cmsDriver.py RECO --conditions 140X_dataRun3_v1"));
    assert!(ctx
        .remote
        .uploaded(&format!("{}/{}", workspace, UPLOAD_SCRIPT))
        .is_some());
    let executed = ctx.remote.executed();
    assert_eq!(
        executed.first().unwrap(),
        &vec![format!("rm -rf {}", workspace), format!("mkdir -p {}", workspace)]
    );
    assert_eq!(
        executed.last().unwrap(),
        &vec![format!("rm -rf {}", workspace)]
    );
    assert_eq!(ctx.remote.open_sessions(), 0);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].subject,
        format!("[Success] RelVal {} submission", ID)
    );
    assert!(sent[0].body.contains(&workflow));
    assert_eq!(
        sent[0].recipients,
        vec!["relval-team@example.org".to_string()]
    );
}

#[tokio::test]
async fn failed_upload_reverts_to_approved() {
    let ctx = setup();
    let mut rv = ctx.input_chain(ID, RelvalStatus::Approved);
    rv.steps[1].config_id = "left-over".to_string();
    ctx.save(&rv);
    ctx.remote
        .respond(
            UPLOAD_SCRIPT,
            CommandOutput::failed(1, "upload refused: no proxy"),
        );

    ctx.next_one(ID).await.unwrap();
    let rv = ctx.wait_for(ID, submission_recorded).await;
    ctx.settle().await;

    assert_eq!(rv.status, RelvalStatus::Approved);
    assert!(rv.steps.iter().all(|s| s.config_id.is_empty()));
    assert_eq!(rv.campaign_timestamp, 0);
    assert!(history_has(&rv, "submission", "failed"));
    assert!(ctx.jobs.submitted().is_empty());
    assert_eq!(ctx.remote.open_sessions(), 0);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, format!("RelVal {} submission failed", ID));
    assert!(sent[0]
        .body
        .contains(&format!("Unfortunately submission of {} failed", ID)));
    assert!(sent[0].body.contains("upload refused: no proxy"));
    assert!(sent[0].body.contains("https://rvt.example.org/relvals?prepid="));
    let attachment = sent[0].attachment.as_ref().unwrap();
    assert!(attachment.content.contains("cmsDriver.py RECO"));
}

#[tokio::test]
async fn rejected_job_spec_reverts_to_approved() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.upload_succeeds(&[("step_2_cfg", "abc123")]);
    ctx.jobs.fail_submit("bad request string");

    ctx.next_one(ID).await.unwrap();
    let rv = ctx.wait_for(ID, submission_recorded).await;
    ctx.settle().await;

    assert_eq!(rv.status, RelvalStatus::Approved);
    assert_eq!(rv.steps[1].config_id, "");
    assert!(rv.workflows.is_empty());
    assert!(ctx.notifier.sent()[0].body.contains("bad request string"));
}

#[tokio::test]
async fn missing_config_id_reverts_to_approved() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.upload_succeeds(&[("step_5_cfg", "zzz")]);

    ctx.next_one(ID).await.unwrap();
    let rv = ctx.wait_for(ID, submission_recorded).await;
    ctx.settle().await;

    assert_eq!(rv.status, RelvalStatus::Approved);
    assert!(ctx.notifier.sent()[0]
        .body
        .contains("Could not find hash for RECO"));
}

#[tokio::test]
async fn unreachable_host_reverts_to_approved() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.remote.fail_connect("no route to host");

    ctx.next_one(ID).await.unwrap();
    let rv = ctx.wait_for(ID, submission_recorded).await;
    ctx.settle().await;

    assert_eq!(rv.status, RelvalStatus::Approved);
    assert!(ctx.remote.executed().is_empty());
}

#[tokio::test]
async fn workflow_approval_failure_keeps_the_submission() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.upload_succeeds(&[("step_2_cfg", "abc123")]);
    ctx.jobs.fail_set_status("workflow locked");

    ctx.next_one(ID).await.unwrap();
    ctx.wait_for(ID, submitted).await;
    ctx.settle().await;

    let rv = ctx.load(ID);
    assert_eq!(rv.status, RelvalStatus::Submitted);
    assert_eq!(
        ctx.notifier.sent()[0].subject,
        format!("[Success] RelVal {} submission", ID)
    );
}

#[yare::parameterized(
    invalid = { "INVALID", "/RelValTTbar/Run2024A-v1/RAW type is INVALID, it must be VALID" },
    unknown = { "", "could not get status of dataset /RelValTTbar/Run2024A-v1/RAW" },
)]
fn input_dataset_must_be_valid(access_type: &str, reason: &str) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let ctx = setup();
        let mut rv = relval(ID, RelvalStatus::Approved);
        rv.steps = vec![input_step("input", RAW, &[]), driver_step("RECO", "gt", &["RECO"])];
        rv.steps[1].resolved_conditions = "gt".to_string();
        ctx.save(&rv);
        if !access_type.is_empty() {
            ctx.catalog.add_dataset(RAW, access_type);
        }

        let err = ctx.next_one(ID).await.unwrap_err();

        assert_eq!(err.to_string(), reason);
        assert_eq!(ctx.load(ID).status, RelvalStatus::Approved);
        assert!(ctx.ctl.queued_names().is_empty());
    });
}

#[tokio::test]
async fn catalog_outage_fails_the_submission_request() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);
    ctx.catalog.fail("catalog down");

    let err = ctx.next_one(ID).await.unwrap_err();

    assert!(matches!(err, ControllerError::ExternalService(_)));
    assert_eq!(ctx.load(ID).status, RelvalStatus::Approved);
}

#[tokio::test]
async fn queued_task_skips_relvals_rolled_back_meanwhile() {
    let ctx = setup();
    ctx.input_chain(ID, RelvalStatus::Approved);

    ctx.ctl.run_submission(&RelvalId::new(ID)).await;

    assert!(ctx.remote.calls().is_empty());
    assert_eq!(ctx.load(ID).status, RelvalStatus::Approved);
}
