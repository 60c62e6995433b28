//! Status walk specs: create → next → previous → show → delete

use crate::prelude::*;

fn create_driver(ws: &Workspace) {
    ws.file("draft.json", DRIVER_DRAFT);
    ws.rvt()
        .args(&["create", "-f", "draft.json"])
        .passes()
        .stdout_eq(&format!("Created {}\n", FIRST_ID));
}

#[test]
fn create_next_previous_show_delete() {
    let ws = Workspace::empty();
    create_driver(&ws);

    ws.rvt()
        .args(&["next", FIRST_ID])
        .passes()
        .stdout_eq(&format!("{}  approved\n", FIRST_ID));

    ws.rvt()
        .args(&["show", FIRST_ID])
        .passes()
        .stdout_has("Status:   approved")
        .stdout_has("1. GEN-SIM  driver 140X_mcRun3_2024_realistic_v1");

    ws.rvt()
        .args(&["previous", FIRST_ID])
        .passes()
        .stdout_eq(&format!("{}  new\n", FIRST_ID));

    let shown = ws.rvt().args(&["show", FIRST_ID, "-o", "json"]).passes();
    let doc = shown.json();
    assert_eq!(doc["status"], "new");
    assert_eq!(doc["steps"][0]["resolved_conditions"], "");
    let actions: Vec<&str> = doc["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.first(), Some(&"created"));
    assert_eq!(doc["history"][0]["user"], "operator");
    assert!(actions.len() >= 3, "history: {actions:?}");

    ws.rvt()
        .args(&["delete", FIRST_ID])
        .passes()
        .stdout_eq(&format!("Deleted {}\n", FIRST_ID));

    ws.rvt()
        .args(&["show", FIRST_ID])
        .fails()
        .stderr_has("not found");
}

#[test]
fn approved_relval_cannot_be_deleted() {
    let ws = Workspace::empty();
    create_driver(&ws);
    ws.rvt().args(&["next", FIRST_ID]).passes();

    ws.rvt()
        .args(&["delete", FIRST_ID])
        .fails()
        .stderr_has("status is approved");
}

#[test]
fn next_json_reports_each_id() {
    let ws = Workspace::empty();
    create_driver(&ws);

    let run = ws
        .rvt()
        .args(&["next", FIRST_ID, "REL-2024-00404", "-o", "json"])
        .fails();
    let entries = run.json();
    assert_eq!(entries[0]["id"], FIRST_ID);
    assert_eq!(entries[0]["status"], "approved");
    assert_eq!(entries[1]["id"], "REL-2024-00404");
    assert_eq!(entries[1]["error"], "REL-2024-00404 not found");
}

#[test]
fn ids_keep_counting_after_delete() {
    let ws = Workspace::empty();
    create_driver(&ws);
    ws.rvt().args(&["delete", FIRST_ID]).passes();

    ws.rvt()
        .args(&["create", "-f", "draft.json"])
        .passes()
        .stdout_eq("Created CMSSW_14_0_0__fall-TTbar-00002\n");
}
