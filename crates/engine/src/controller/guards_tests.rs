// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rv_adapters::FakeDatasetCatalog;
use rv_core::test_support::{driver_step, input_step, relval};
use rv_core::{GpuRequirement, RelvalStatus};

const RAW: &str = "/RelValTTbar/Run2024-v1/RAW";

#[test]
fn gpu_reasons_itemize_each_missing_field() {
    let mut rv = relval("R-00001", RelvalStatus::New);
    rv.steps = vec![
        driver_step("gen", "auto:phase1", &["GEN-SIM"]),
        driver_step("digi", "auto:phase1", &["RAW"]),
    ];
    rv.steps[1].gpu.requires = GpuRequirement::Required;
    rv.steps[1].gpu.cuda_runtime = "12.0".to_string();

    assert_eq!(
        gpu_reasons(&rv),
        vec![
            "R-00001 step 2: gpu_memory not set".to_string(),
            "R-00001 step 2: cuda_capabilities not set".to_string(),
        ]
    );
}

#[test]
fn forbidden_gpu_needs_nothing() {
    let mut rv = relval("R-00001", RelvalStatus::New);
    rv.steps = vec![driver_step("gen", "auto:phase1", &["GEN-SIM"])];
    assert!(gpu_reasons(&rv).is_empty());
}

#[tokio::test]
async fn run_intersection_passes_when_any_run_present() {
    let catalog = FakeDatasetCatalog::new();
    catalog.set_runs(RAW, vec![12344, 12345]);
    let mut rv = relval("R-00007", RelvalStatus::New);
    rv.steps = vec![input_step("input", RAW, &[12345, 99999])];

    assert!(run_reasons(&catalog, &rv).await.unwrap().is_empty());
}

#[tokio::test]
async fn run_intersection_reports_missing_runs() {
    let catalog = FakeDatasetCatalog::new();
    catalog.set_runs(RAW, vec![1]);
    let mut rv = relval("R-00007", RelvalStatus::New);
    rv.steps = vec![input_step("input", &format!("input:{}", RAW), &[12345])];

    assert_eq!(
        run_reasons(&catalog, &rv).await.unwrap(),
        vec![format!("R-00007 step 1: runs 12345 are not in dataset {}", RAW)]
    );
}

#[tokio::test]
async fn run_check_surfaces_catalog_failure() {
    let catalog = FakeDatasetCatalog::new();
    catalog.fail("catalog down");
    let mut rv = relval("R-00007", RelvalStatus::New);
    rv.steps = vec![input_step("input", RAW, &[12345])];

    let err = run_reasons(&catalog, &rv).await.unwrap_err();
    assert!(matches!(err, ControllerError::ExternalService(_)));
}

#[test]
fn dataset_reasons_require_valid_access() {
    let mut rv = relval("R-00001", RelvalStatus::Approved);
    let mut pileup = driver_step("digi", "auto:phase1", &["RAW"]);
    if let StepSpec::CommandDriven(driver) = &mut pileup.spec {
        driver.pileup_input = "/MinBias/Run2024-v1/GEN-SIM".to_string();
    }
    rv.steps = vec![input_step("input", RAW, &[1]), pileup];

    let mut access = HashMap::new();
    access.insert(RAW.to_string(), "VALID".to_string());
    assert_eq!(
        dataset_reasons(&rv, &access),
        vec!["could not get status of dataset /MinBias/Run2024-v1/GEN-SIM".to_string()]
    );

    access.insert(
        "/MinBias/Run2024-v1/GEN-SIM".to_string(),
        "PRODUCTION".to_string(),
    );
    assert_eq!(
        dataset_reasons(&rv, &access),
        vec!["/MinBias/Run2024-v1/GEN-SIM type is PRODUCTION, it must be VALID".to_string()]
    );
}

#[test]
fn wanted_conditions_groups_by_environment() {
    let mut a = relval("R-00001", RelvalStatus::New);
    a.steps = vec![
        driver_step("gen", "auto:phase1", &[]),
        driver_step("reco", "140X_fixed", &[]),
    ];
    let mut b = relval("R-00002", RelvalStatus::New);
    let mut step = driver_step("gen", "auto:phase2", &[]);
    step.cmssw_release = "CMSSW_15_0_0".to_string();
    b.steps = vec![step, driver_step("reco", "auto:phase1", &[])];

    let tree = wanted_conditions(&[a, b]);
    let base = ("CMSSW_14_0_0".to_string(), "el8_amd64_gcc12".to_string());
    let newer = ("CMSSW_15_0_0".to_string(), "el8_amd64_gcc12".to_string());
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[&base].iter().collect::<Vec<_>>(), vec!["auto:phase1"]);
    assert_eq!(tree[&newer].iter().collect::<Vec<_>>(), vec!["auto:phase2"]);
}

#[test]
fn parse_resolved_keeps_auto_lines() {
    let parsed = parse_resolved(
        "Setting up environment\nauto:phase1 140X_mcRun3_v1\nauto:phase2   141X_mcRun4_v2\n\n",
    );
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed["auto:phase1"], "140X_mcRun3_v1");
    assert_eq!(parsed["auto:phase2"], "141X_mcRun4_v2");
}

#[test]
fn resolved_conditions_apply_and_report() {
    let mut rv = relval("R-00003", RelvalStatus::New);
    rv.steps = vec![
        input_step("input", RAW, &[1]),
        driver_step("reco", "auto:phase1", &[]),
        driver_step("harvest", "140X_fixed", &[]),
        driver_step("extra", "auto:unknown", &[]),
    ];
    let mut resolved = ResolvedConditions::default();
    resolved.insert(
        "CMSSW_14_0_0",
        "el8_amd64_gcc12",
        "auto:phase1",
        "140X_mcRun3_v1",
    );

    assert_eq!(
        resolved.reasons(&rv),
        vec!["R-00003 step 4: cannot resolve auto:unknown in CMSSW_14_0_0 el8_amd64_gcc12"
            .to_string()]
    );

    resolved.apply(&mut rv);
    assert_eq!(rv.steps[0].resolved_conditions, "");
    assert_eq!(rv.steps[1].resolved_conditions, "140X_mcRun3_v1");
    assert_eq!(rv.steps[2].resolved_conditions, "140X_fixed");
}

#[test]
fn environment_failure_is_reported_to_affected_relvals() {
    let mut affected = relval("R-00004", RelvalStatus::New);
    affected.steps = vec![driver_step("gen", "auto:phase1", &[])];
    let mut unaffected = relval("R-00005", RelvalStatus::New);
    unaffected.steps = vec![driver_step("gen", "140X_fixed", &[])];

    let mut resolved = ResolvedConditions::default();
    resolved.fail(
        "CMSSW_14_0_0",
        "el8_amd64_gcc12",
        PrefetchFailure::Remote {
            exit_code: 1,
            stderr: "no such release".to_string(),
        },
    );

    let failure = resolved.failure_for(&affected).unwrap();
    assert!(matches!(
        failure.to_error(),
        ControllerError::RemoteExecutionFailed { exit_code: 1, .. }
    ));
    assert!(resolved.failure_for(&unaffected).is_none());
}
