// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rv_core::test_support::{driver_step, input_step, relval};
use rv_core::{GpuSpec, RelvalStatus};

fn two_step_relval() -> Relval {
    let mut rv = relval("CMSSW_14_0_0__fall-TTbar-00007", RelvalStatus::Submitting);
    rv.steps = vec![
        input_step("input", "/RelValTTbar/Run2024-v1/RAW", &[12345]),
        driver_step("reco", "auto:phase1", &["RECO", "DQMIO"]),
    ];
    rv.steps[1].resolved_conditions = "140X_dataRun3_v1".to_string();
    rv.steps[1].config_id = "abc123".to_string();
    rv.campaign_timestamp = 1_700_000_000;
    rv
}

#[yare::parameterized(
    stamped = { 1_700_000_000, "CMSSW_14_0_0__fall-1700000000" },
    unstamped = { 0, "CMSSW_14_0_0__fall" },
)]
fn campaign_name(timestamp: u64, expected: &str) {
    let mut rv = relval("R-00001", RelvalStatus::Approved);
    rv.campaign_timestamp = timestamp;
    assert_eq!(campaign(&rv), expected);
}

#[test]
fn request_string_is_trimmed_and_bounded() {
    let mut rv = relval("R-00001", RelvalStatus::Approved);
    assert_eq!(request_string(&rv), "RVCMSSW_14_0_0TTbar");

    rv.label = "x".repeat(200);
    assert_eq!(request_string(&rv).len(), 72);
}

#[test]
fn generate_script_uses_resolved_conditions() {
    let script = generate_script(&two_step_relval());
    assert!(script.starts_with("#!/bin/bash\n"));
    assert!(script.contains("export SCRAM_ARCH=el8_amd64_gcc12"));
    assert!(script.contains(
        "cmsDriver.py reco --conditions 140X_dataRun3_v1 --datatier RECO,DQMIO \
         --python_filename step_2_cfg.py --no_exec || exit $?"
    ));
    assert!(!script.contains("auto:phase1"));
}

#[test]
fn generate_script_switches_environment_per_release() {
    let mut rv = two_step_relval();
    let mut later = driver_step("harvest", "auto:phase1", &["DQMIO"]);
    later.cmssw_release = "CMSSW_14_1_0".to_string();
    rv.steps.push(later);

    let script = generate_script(&rv);
    assert_eq!(script.matches("export SCRAM_ARCH").count(), 2);
    assert!(script.contains("# CMSSW_14_1_0 el8_amd64_gcc12"));
}

#[test]
fn upload_script_checks_and_uploads_each_config() {
    let script = upload_script(&two_step_relval(), "config_upload");
    assert!(script.contains("if [ ! -s \"step_2_cfg.py\" ]; then"));
    assert!(script.contains(
        "config_upload --file $(pwd)/step_2_cfg.py --label step_2_cfg || exit $?"
    ));
    assert!(!script.contains("step_1_cfg"));
}

#[test]
fn job_spec_chains_tasks_from_input() {
    let spec = job_spec(&two_step_relval());
    assert_eq!(spec["RequestType"], "TaskChain");
    assert_eq!(spec["PrepID"], "CMSSW_14_0_0__fall-TTbar-00007");
    assert_eq!(spec["Campaign"], "CMSSW_14_0_0__fall-1700000000");
    assert_eq!(spec["TaskChain"], 1);
    assert_eq!(spec["GlobalTag"], "140X_dataRun3_v1");

    let task = &spec["Task1"];
    assert_eq!(task["TaskName"], "reco");
    assert_eq!(task["ConfigCacheID"], "abc123");
    assert_eq!(task["InputDataset"], "/RelValTTbar/Run2024-v1/RAW");
    assert_eq!(task["RunWhitelist"], serde_json::json!([12345]));
    assert_eq!(task["RequiresGPU"], "forbidden");
    assert!(task.get("GPUParams").is_none());
    assert!(task.get("Seeding").is_none());
}

#[test]
fn job_spec_generator_chain() {
    let mut rv = relval("R-00002", RelvalStatus::Submitting);
    rv.steps = vec![
        driver_step("gen", "auto:phase1", &["GEN-SIM"]),
        driver_step("digi", "auto:phase1", &["GEN-SIM-DIGI-RAW"]),
    ];
    rv.steps[1].gpu = GpuSpec {
        requires: rv_core::GpuRequirement::Optional,
        gpu_memory: Some(8000),
        cuda_capabilities: vec!["7.5".to_string()],
        cuda_runtime: "12.0".to_string(),
    };

    let spec = job_spec(&rv);
    assert_eq!(spec["TaskChain"], 2);
    assert_eq!(spec["Task1"]["Seeding"], "AutomaticSeeding");
    assert_eq!(spec["Task1"]["PrimaryDataset"], "RelValTTbar");
    assert_eq!(spec["Task2"]["InputTask"], "gen");
    assert_eq!(spec["Task2"]["RequiresGPU"], "optional");
    assert_eq!(spec["Task2"]["GPUParams"]["GPUMemoryMB"], 8000);
}
