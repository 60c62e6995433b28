//! CLI error handling specs

use crate::prelude::*;

#[test]
fn show_unknown_id_fails() {
    let ws = Workspace::empty();
    ws.rvt()
        .args(&["show", "REL-2024-00404"])
        .fails()
        .stderr_has("Error: REL-2024-00404 not found");
}

#[test]
fn create_requires_a_release() {
    let ws = Workspace::empty();
    ws.rvt()
        .args(&["create", "--workflow-name", "TTbar"])
        .fails()
        .stderr_has("cmssw_release is required");
}

#[test]
fn create_rejects_malformed_draft() {
    let ws = Workspace::empty();
    ws.file("draft.json", "[1, 2, 3]");
    ws.rvt()
        .args(&["create", "-f", "draft.json"])
        .fails()
        .stderr_has("draft must be a JSON object");
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::empty();
    ws.state_file("config.toml", "[engine]\nthreads = 4\n");
    ws.rvt()
        .args(&["list"])
        .fails()
        .stderr_has("invalid config");
}

#[test]
fn next_on_a_relval_without_steps_fails_with_exit_code_one() {
    let ws = Workspace::empty();
    ws.rvt()
        .args(&[
            "create",
            "--release",
            "CMSSW_14_0_0",
            "--batch",
            "fall",
            "--workflow-name",
            "Empty",
        ])
        .passes();

    let id = "CMSSW_14_0_0__fall-Empty-00001";
    let run = ws
        .rvt()
        .args(&["next", id])
        .fails()
        .stdout_has(&format!("{id}  failed: {id} has no steps"))
        .stderr_has("Error: 1 of 1 failed");
    assert_eq!(run.code(), Some(1));
}
