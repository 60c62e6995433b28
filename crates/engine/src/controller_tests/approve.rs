// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rv_adapters::RemoteCall;
use rv_core::GpuRequirement;

const AUTO: &str = "auto:phase1_2024";
const GLOBAL_TAG: &str = "140X_mcRun3_2024_realistic_v1";

fn generator(ctx: &TestContext, id: &str) -> Relval {
    let mut rv = relval(id, RelvalStatus::New);
    rv.steps = vec![
        driver_step("GEN", AUTO, &["GEN-SIM"]),
        driver_step("RECO", "140X_fixed_v2", &["RECO"]),
    ];
    ctx.save(&rv);
    rv
}

fn resolver_prints(ctx: &TestContext, stdout: &str) {
    ctx.remote
        .respond("resolve_conditions", CommandOutput::ok(stdout));
}

#[tokio::test]
async fn approval_resolves_auto_conditions() {
    let ctx = setup();
    generator(&ctx, "A-00001");
    resolver_prints(&ctx, &format!("{} {}\n", AUTO, GLOBAL_TAG));

    let approved = ctx.next_one("A-00001").await.unwrap();

    assert_eq!(approved.status, RelvalStatus::Approved);
    assert_eq!(approved.steps[0].resolved_conditions, GLOBAL_TAG);
    assert_eq!(approved.steps[1].resolved_conditions, "140X_fixed_v2");
    assert_eq!(ctx.load("A-00001"), approved);
    assert!(history_has(&approved, "status", "approved"));
}

#[tokio::test]
async fn one_resolver_call_per_environment() {
    let ctx = setup();
    generator(&ctx, "A-00001");
    let mut other_arch = generator(&ctx, "A-00002");
    other_arch.scram_arch = "el9_amd64_gcc12".to_string();
    ctx.save(&other_arch);
    generator(&ctx, "A-00003");
    resolver_prints(&ctx, &format!("{} {}\n", AUTO, GLOBAL_TAG));

    let results = ctx.next(&["A-00001", "A-00002", "A-00003"]).await;
    assert!(results.iter().all(|(_, r)| r.is_ok()));

    let executed = ctx.remote.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(
        executed[0],
        vec![format!(
            "resolve_conditions \"CMSSW_14_0_0\" \"el8_amd64_gcc12\" \"{}\" || exit $?",
            AUTO
        )]
    );
    let connects = ctx
        .remote
        .calls()
        .iter()
        .filter(|c| matches!(c, RemoteCall::Connect { .. }))
        .count();
    assert_eq!(connects, 1);
    assert_eq!(ctx.remote.open_sessions(), 0);
}

#[tokio::test]
async fn no_remote_call_without_auto_conditions() {
    let ctx = setup();
    ctx.input_chain("A-00001", RelvalStatus::New);

    ctx.next_one("A-00001").await.unwrap();

    assert!(ctx.remote.calls().is_empty());
}

#[tokio::test]
async fn unresolved_condition_is_itemized() {
    let ctx = setup();
    generator(&ctx, "A-00001");
    resolver_prints(&ctx, "auto:other 140X_other_v1\n");

    let err = ctx.next_one("A-00001").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "A-00001 step 1: cannot resolve auto:phase1_2024 in CMSSW_14_0_0 el8_amd64_gcc12"
    );
    assert_eq!(ctx.load("A-00001").status, RelvalStatus::New);
}

#[tokio::test]
async fn resolver_failure_fails_every_relval_of_the_environment() {
    let ctx = setup();
    generator(&ctx, "A-00001");
    generator(&ctx, "A-00002");
    ctx.remote.respond(
        "resolve_conditions",
        CommandOutput::failed(2, "release not installed"),
    );

    let results = ctx.next(&["A-00001", "A-00002"]).await;

    for (id, result) in results {
        match result {
            Err(ControllerError::RemoteExecutionFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, 2);
                assert_eq!(stderr, "release not installed");
            }
            other => panic!("{}: unexpected {:?}", id, other),
        }
        assert_eq!(ctx.load(id.as_str()).status, RelvalStatus::New);
    }
}

#[tokio::test]
async fn gpu_parameters_are_required_unless_forbidden() {
    let ctx = setup();
    let mut rv = ctx.input_chain("A-00001", RelvalStatus::New);
    rv.steps[1].gpu.requires = GpuRequirement::Required;
    rv.steps[1].gpu.cuda_runtime = "12.4".to_string();
    ctx.save(&rv);

    match ctx.next_one("A-00001").await {
        Err(ControllerError::GuardFailed(reasons)) => assert_eq!(
            reasons,
            vec![
                "A-00001 step 2: gpu_memory not set".to_string(),
                "A-00001 step 2: cuda_capabilities not set".to_string(),
            ]
        ),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn requested_runs_must_exist_in_the_dataset() {
    let ctx = setup();
    let mut rv = ctx.input_chain("A-00001", RelvalStatus::New);
    rv.steps[0] = input_step("input", RAW, &[1, 2]);
    ctx.save(&rv);

    let err = ctx.next_one("A-00001").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("A-00001 step 1: runs 1, 2 are not in dataset {}", RAW)
    );
}

#[tokio::test]
async fn relval_without_steps_cannot_be_approved() {
    let ctx = setup();
    ctx.save(&relval("A-00001", RelvalStatus::New));

    let err = ctx.next_one("A-00001").await.unwrap_err();
    assert_eq!(err.to_string(), "A-00001 has no steps");
}

#[tokio::test]
async fn batch_keeps_input_order_and_isolates_failures() {
    let ctx = setup();
    ctx.input_chain("A-00001", RelvalStatus::New);
    ctx.save(&relval("A-00002", RelvalStatus::New));
    ctx.input_chain("A-00003", RelvalStatus::Done);

    let results = ctx
        .next(&["A-00002", "missing", "A-00001", "A-00002", "A-00003"])
        .await;

    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["A-00002", "missing", "A-00001", "A-00003"]);
    assert!(matches!(results[0].1, Err(ControllerError::GuardFailed(_))));
    assert!(matches!(results[1].1, Err(ControllerError::NotFound(_))));
    assert_eq!(
        results[2].1.as_ref().map(|rv| rv.status).ok(),
        Some(RelvalStatus::Approved)
    );
    assert!(matches!(
        results[3].1,
        Err(ControllerError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn locked_relval_fails_fast() {
    let ctx = setup();
    ctx.input_chain("A-00001", RelvalStatus::New);
    let _held = ctx
        .ctl
        .inner
        .locks
        .try_acquire("A-00001", &LockOwner::generate(), "test")
        .unwrap();

    let err = ctx.next_one("A-00001").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "A-00001 is locked: operation already in progress"
    );
    assert_eq!(ctx.load("A-00001").status, RelvalStatus::New);
}
