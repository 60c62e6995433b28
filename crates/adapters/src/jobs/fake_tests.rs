// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[tokio::test]
async fn submitted_spec_is_fetchable_under_prep_id() {
    let jobs = FakeJobManager::new();
    let name = jobs
        .submit(&json!({"PrepID": "R-00001", "RequestType": "TaskChain"}))
        .await
        .unwrap();
    assert_eq!(name, "fake_R-00001_1");

    let records = jobs.fetch("R-00001").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_type, "TaskChain");
    assert_eq!(records[0].transitions[0].status, "new");
}

#[tokio::test]
async fn set_status_appends_transition() {
    let jobs = FakeJobManager::new();
    let name = jobs.submit(&json!({"PrepID": "R-00001"})).await.unwrap();
    jobs.set_status(&name, "assignment-approved").await.unwrap();

    let records = jobs.fetch("R-00001").await.unwrap();
    let statuses: Vec<_> = records[0]
        .transitions
        .iter()
        .map(|t| t.status.as_str())
        .collect();
    assert_eq!(statuses, vec!["new", "assignment-approved"]);
    assert_eq!(
        jobs.status_changes(),
        vec![(name, "assignment-approved".to_string())]
    );
}

#[tokio::test]
async fn scripted_failures() {
    let jobs = FakeJobManager::new();
    jobs.fail_submit("unavailable");
    jobs.fail_fetch("unavailable");
    jobs.fail_set_status("unavailable");

    assert!(jobs.submit(&json!({})).await.is_err());
    assert!(jobs.fetch("R").await.is_err());
    assert!(jobs.set_status("wf", "rejected").await.is_err());
    assert_eq!(jobs.calls().len(), 3);
}

#[tokio::test]
async fn set_records_replaces_fetch_result() {
    let jobs = FakeJobManager::new();
    jobs.set_records(
        "R-00002",
        vec![JobRecord {
            name: "wf".to_string(),
            request_type: "TaskChain".to_string(),
            prep_id: "R-00002".to_string(),
            output_datasets: vec!["/A/B-v1/GEN-SIM".to_string()],
            transitions: Vec::new(),
        }],
    );
    let records = jobs.fetch("R-00002").await.unwrap();
    assert_eq!(records[0].output_datasets, vec!["/A/B-v1/GEN-SIM"]);
}
