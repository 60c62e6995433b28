// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_new_and_as_str() {
    let id = TestId::new("abc");
    assert_eq!(id.as_str(), "abc");
    assert_eq!(id.to_string(), "abc");
}

#[test]
fn define_id_partial_eq_str() {
    let id = TestId::new("test");
    assert_eq!(id, *"test");
    assert_eq!(id, "test");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    map.insert(TestId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));

    let id = TestId::new("k");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "k");
}

#[test]
fn define_id_serializes_as_plain_string() {
    let json = serde_json::to_string(&TestId::new("x-1")).unwrap();
    assert_eq!(json, "\"x-1\"");
}

#[test]
fn compose_zero_pads_serial() {
    let id = RelvalId::compose("REL-2024", 7);
    assert_eq!(id, "REL-2024-00007");
}

#[test]
fn split_returns_namespace_and_serial() {
    let id = RelvalId::new("CMSSW_14_0_0__fall-TTbar-00042");
    assert_eq!(id.split(), Some(("CMSSW_14_0_0__fall-TTbar", 42)));
    assert_eq!(id.namespace(), Some("CMSSW_14_0_0__fall-TTbar"));
    assert_eq!(id.serial(), Some(42));
}

#[yare::parameterized(
    no_dash = { "plain" },
    empty_serial = { "ns-" },
    empty_namespace = { "-00001" },
    non_numeric = { "ns-abc" },
    signed = { "ns-+1" },
)]
fn split_rejects_malformed(raw: &str) {
    assert_eq!(RelvalId::new(raw).split(), None);
}

#[test]
fn namespace_trims_separators() {
    assert_eq!(
        prepid_namespace("CMSSW_14_0_0", "fall", "TTbar"),
        "CMSSW_14_0_0__fall-TTbar"
    );
    assert_eq!(prepid_namespace("CMSSW_14_0_0", "", ""), "CMSSW_14_0_0");
}
