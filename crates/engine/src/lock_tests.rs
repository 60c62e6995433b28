// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn owner(name: &str) -> LockOwner {
    LockOwner::new(name)
}

#[test]
fn try_acquire_on_free_key_succeeds() {
    let locks = LockRegistry::default();
    let guard = locks.try_acquire("R-00001", &owner("a"), "submit").unwrap();
    assert_eq!(guard.key(), "R-00001");
    assert!(locks.is_locked("R-00001"));
    drop(guard);
    assert!(!locks.is_locked("R-00001"));
}

#[test]
fn try_acquire_held_by_other_owner_fails_with_key() {
    let locks = LockRegistry::default();
    let _held = locks.try_acquire("R-00001", &owner("a"), "submit").unwrap();
    let err = locks
        .try_acquire("R-00001", &owner("b"), "update")
        .unwrap_err();
    assert_eq!(err.key, "R-00001");
    assert_eq!(
        err.to_string(),
        "R-00001 is locked: operation already in progress"
    );
}

#[test]
fn sequential_try_acquires_both_succeed() {
    let locks = LockRegistry::default();
    drop(locks.try_acquire("k", &owner("a"), "").unwrap());
    drop(locks.try_acquire("k", &owner("b"), "").unwrap());
}

#[test]
fn reentrant_for_same_owner() {
    let locks = LockRegistry::default();
    let me = owner("a");
    let outer = locks.try_acquire("k", &me, "outer").unwrap();
    let inner = locks.try_acquire("k", &me, "inner").unwrap();
    assert_eq!(locks.status()["k"].depth, 2);

    drop(inner);
    assert!(locks.is_locked("k"), "still held after one release");
    assert!(locks.try_acquire("k", &owner("b"), "").is_err());

    drop(outer);
    assert!(!locks.is_locked("k"));
    assert!(locks.try_acquire("k", &owner("b"), "").is_ok());
}

#[tokio::test]
async fn acquire_on_fresh_registry_returns_guard() {
    let locks = LockRegistry::default();
    let guard = locks.acquire("R-00001", &owner("a"), "approve").await;
    assert_eq!(guard.key(), "R-00001");
    assert_eq!(locks.status()["R-00001"].info, "approve");
    drop(guard);
    assert!(!locks.is_locked("R-00001"));
}

#[tokio::test]
async fn reentrant_blocking_acquire_does_not_deadlock() {
    let locks = LockRegistry::default();
    let me = owner("a");
    let _outer = locks.acquire("k", &me, "outer").await;
    let inner =
        tokio::time::timeout(Duration::from_secs(1), locks.acquire("k", &me, "inner")).await;
    assert!(inner.is_ok());
}

#[tokio::test]
async fn acquire_waits_for_release() {
    let locks = LockRegistry::default();
    let held = locks.try_acquire("k", &owner("a"), "first").unwrap();

    let waiter = {
        let locks = locks.clone();
        tokio::spawn(async move {
            let guard = locks.acquire("k", &owner("b"), "second").await;
            locks.status()["k"].info.clone() + &format!(":{}", guard.key())
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    drop(held);
    let info = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info, "second:k");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn holders_never_overlap() {
    let locks = LockRegistry::default();
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..16 {
        let locks = locks.clone();
        let inside = Arc::clone(&inside);
        let max_inside = Arc::clone(&max_inside);
        handles.push(tokio::spawn(async move {
            let _guard = locks.acquire("shared", &owner(&format!("t{i}")), "").await;
            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
            max_inside.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            inside.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

#[test]
fn status_reports_held_and_info() {
    let locks = LockRegistry::default();
    let _held = locks
        .try_acquire("R-00001", &owner("a"), "submission of R-00001")
        .unwrap();
    drop(locks.try_acquire("R-00002", &owner("a"), "update").unwrap());

    let status = locks.status();
    assert!(status["R-00001"].held);
    assert_eq!(status["R-00001"].info, "submission of R-00001");
    assert_eq!(status["R-00001"].owner, Some(owner("a")));
    assert!(!status["R-00002"].held);
    assert_eq!(status["R-00002"].depth, 0);
}

#[test]
fn prune_keeps_held_and_current_keys() {
    let locks = LockRegistry::new(3);
    let _held = locks.try_acquire("held", &owner("a"), "").unwrap();
    for i in 0..3 {
        drop(locks.try_acquire(&format!("idle-{i}"), &owner("a"), "").unwrap());
    }
    // Fourth distinct key pushed the registry past 3 and pruned idle ones
    let keys: Vec<_> = locks.status().into_keys().collect();
    assert!(keys.contains(&"held".to_string()));
    assert!(keys.contains(&"idle-2".to_string()));
    assert!(locks.len() <= 3);
}

proptest! {
    #[test]
    fn registry_settles_below_threshold(threshold in 1usize..20, extra in 1usize..40) {
        let locks = LockRegistry::new(threshold);
        for i in 0..(threshold + extra) {
            drop(locks.try_acquire(&format!("key-{i}"), &owner("a"), "").unwrap());
        }
        prop_assert!(locks.len() <= threshold);
    }

    #[test]
    fn held_keys_survive_pruning(threshold in 2usize..10, extra in 1usize..20) {
        let locks = LockRegistry::new(threshold);
        let _held = locks.try_acquire("pinned", &owner("a"), "").unwrap();
        for i in 0..(threshold + extra) {
            drop(locks.try_acquire(&format!("key-{i}"), &owner("b"), "").unwrap());
        }
        prop_assert!(locks.is_locked("pinned"));
        prop_assert!(locks.len() <= threshold);
    }
}
