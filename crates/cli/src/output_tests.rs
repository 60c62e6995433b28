// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rv_core::{test_support::relval, RelvalId, RelvalStatus};
use rv_engine::ControllerError;

use super::{batch_entries, BatchEntry};

#[test]
fn batch_entries_keep_order_and_split_outcomes() {
    let approved = relval("REL-2024-00001", RelvalStatus::Approved);
    let results = vec![
        (approved.id.clone(), Ok(approved)),
        (
            RelvalId::new("REL-2024-00002"),
            Err(ControllerError::AlreadyLocked("REL-2024-00002".to_string())),
        ),
    ];

    let entries = batch_entries(&results);
    assert_eq!(
        entries,
        vec![
            BatchEntry {
                id: "REL-2024-00001".to_string(),
                status: Some("approved".to_string()),
                error: None,
            },
            BatchEntry {
                id: "REL-2024-00002".to_string(),
                status: None,
                error: Some(
                    "REL-2024-00002 is locked: operation already in progress".to_string()
                ),
            },
        ]
    );
}

#[test]
fn batch_entry_json_omits_missing_fields() {
    let entry = BatchEntry {
        id: "REL-2024-00001".to_string(),
        status: Some("new".to_string()),
        error: None,
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"id": "REL-2024-00001", "status": "new"})
    );
}
