// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rv_core::test_support::{driver_step, input_step, relval};
use rv_core::RelvalStatus;

fn chain() -> Relval {
    let mut rv = relval("CMSSW_14_0_0__fall-TTbar-00001", RelvalStatus::Submitting);
    rv.steps = vec![
        input_step("input", "/RelValTTbar/Run2024A-v1/RAW", &[12345]),
        driver_step("RECO", "auto:phase1_2024", &["RECO"]),
        driver_step("HARVEST", "auto:phase1_2024", &["DQMIO"]),
    ];
    rv
}

#[test]
fn docid_lines_are_parsed() {
    let stdout = "Uploading step_2_cfg\nDocID step_2_cfg abc123\nnoise\nDocID step_3_cfg def456\n";
    assert_eq!(
        parse_config_ids(stdout),
        vec![
            ("step_2_cfg".to_string(), "abc123".to_string()),
            ("step_3_cfg".to_string(), "def456".to_string()),
        ]
    );
}

#[test]
fn docid_line_without_hash_keeps_the_label() {
    assert_eq!(
        parse_config_ids("DocID step_2_cfg\n"),
        vec![("step_2_cfg".to_string(), String::new())]
    );
}

#[test]
fn config_ids_land_on_their_steps() {
    let mut rv = chain();
    let hashes = parse_config_ids("DocID step_3_cfg def\nDocID step_2_cfg abc\n");
    assign_config_ids(&mut rv, &hashes).unwrap();
    assert_eq!(rv.steps[0].config_id, "");
    assert_eq!(rv.steps[1].config_id, "abc");
    assert_eq!(rv.steps[2].config_id, "def");
}

#[test]
fn missing_config_id_names_the_step() {
    let mut rv = chain();
    let hashes = parse_config_ids("DocID step_2_cfg abc\n");
    assert_eq!(
        assign_config_ids(&mut rv, &hashes),
        Err("Could not find hash for HARVEST".to_string())
    );
}

#[test]
fn empty_config_id_is_rejected() {
    let mut rv = chain();
    let hashes = parse_config_ids("DocID step_2_cfg abc\nDocID step_3_cfg\n");
    assert_eq!(
        assign_config_ids(&mut rv, &hashes),
        Err("Missing hash for step HARVEST".to_string())
    );
}

#[test]
fn extra_config_ids_are_rejected() {
    let mut rv = chain();
    let hashes =
        parse_config_ids("DocID step_2_cfg abc\nDocID step_3_cfg def\nDocID step_9_cfg zzz\n");
    assert_eq!(
        assign_config_ids(&mut rv, &hashes),
        Err("Unused hashes: step_9_cfg".to_string())
    );
}

#[test]
fn run_script_enters_the_workspace_first() {
    assert_eq!(
        run_script("ws/X-00001", GENERATE_SCRIPT),
        vec![
            "cd ws/X-00001".to_string(),
            "chmod +x config_generate.sh".to_string(),
            "./config_generate.sh".to_string(),
        ]
    );
}
