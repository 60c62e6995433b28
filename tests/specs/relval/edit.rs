//! Listing and editing specs

use crate::prelude::*;

#[test]
fn list_shows_created_relvals() {
    let ws = Workspace::empty();
    ws.file("draft.json", DRIVER_DRAFT);
    ws.rvt().args(&["create", "-f", "draft.json"]).passes();
    ws.rvt()
        .args(&["create", "-f", "draft.json", "--workflow-name", "ZMM"])
        .passes();

    ws.rvt()
        .args(&["list", "--by-id"])
        .passes()
        .stdout_has("ID")
        .stdout_has("STATUS")
        .stdout_has(FIRST_ID)
        .stdout_has("CMSSW_14_0_0__fall-ZMM-00001");

    let listed = ws.rvt().args(&["list", "-o", "json"]).passes().json();
    assert_eq!(listed["total"], 2);
}

#[test]
fn list_filters_by_status() {
    let ws = Workspace::empty();
    ws.file("draft.json", DRIVER_DRAFT);
    ws.rvt().args(&["create", "-f", "draft.json"]).passes();

    ws.rvt()
        .args(&["list", "--status", "approved"])
        .passes()
        .stdout_eq("No relvals found\n");
}

#[test]
fn notes_stay_editable_and_label_freezes_after_new() {
    let ws = Workspace::empty();
    ws.file("draft.json", DRIVER_DRAFT);
    ws.rvt().args(&["create", "-f", "draft.json"]).passes();
    ws.rvt().args(&["next", FIRST_ID]).passes();

    ws.rvt()
        .args(&["update", FIRST_ID, "--notes", "rerun with new GT"])
        .passes()
        .stdout_eq(&format!("Updated {}\n", FIRST_ID));

    ws.rvt()
        .args(&["update", FIRST_ID, "--label", "pu"])
        .fails()
        .stderr_has("label can only be changed in status new");

    ws.rvt()
        .args(&["show", FIRST_ID])
        .passes()
        .stdout_has("Notes:    rerun with new GT");
}

#[test]
fn update_without_changes_is_a_no_op() {
    let ws = Workspace::empty();
    ws.file("draft.json", DRIVER_DRAFT);
    ws.rvt().args(&["create", "-f", "draft.json"]).passes();

    ws.rvt()
        .args(&["update", FIRST_ID])
        .passes()
        .stdout_eq(&format!("{} unchanged\n", FIRST_ID));
}
