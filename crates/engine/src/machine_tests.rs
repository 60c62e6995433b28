// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use rv_core::test_support::relval;
use rv_core::{Relval, RelvalLifecycle, RelvalStatus, Trigger};
use std::fmt;
use std::sync::Arc;

// A small second kind, so the machine is exercised outside RelVals

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Door {
    Closed,
    Open,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Push {
    Open,
    Close,
    Lock,
    Service,
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for Push {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Gate {
    name: String,
    state: Door,
    log: Vec<String>,
}

struct GateLifecycle;

const GATE_TABLE: &[Transition<Door, Push>] = &[
    Transition { from: Door::Closed, trigger: Push::Open, to: Door::Open },
    Transition { from: Door::Open, trigger: Push::Close, to: Door::Closed },
    Transition { from: Door::Closed, trigger: Push::Lock, to: Door::Locked },
    Transition { from: Door::Locked, trigger: Push::Service, to: Door::Closed },
];

impl Lifecycle for GateLifecycle {
    type Status = Door;
    type Trigger = Push;
    type Entity = Gate;

    const KIND: &'static str = "gate";

    fn table() -> &'static [Transition<Door, Push>] {
        GATE_TABLE
    }

    fn entity_id(entity: &Gate) -> &str {
        &entity.name
    }

    fn status(entity: &Gate) -> Door {
        entity.state
    }

    fn set_status(entity: &mut Gate, status: Door, user: &str, time: u64) {
        entity.state = status;
        entity.log.push(format!("{time} {user} {status}"));
    }

    fn is_internal(trigger: Push) -> bool {
        trigger == Push::Service
    }
}

#[derive(Default)]
struct HookState {
    calls: Vec<&'static str>,
    fail_validate: bool,
    fail_before: bool,
    fail_after: bool,
}

#[derive(Clone, Default)]
struct RecordingHooks {
    inner: Arc<Mutex<HookState>>,
}

impl RecordingHooks {
    fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl TransitionHooks<GateLifecycle> for RecordingHooks {
    async fn validate(&self, _: &Gate, _: &Transition<Door, Push>) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock();
        inner.calls.push("validate");
        if inner.fail_validate {
            return Err(ControllerError::GuardFailed(vec![
                "hinge missing".to_string(),
                "frame bent".to_string(),
            ]));
        }
        Ok(())
    }

    async fn before_transition(
        &self,
        gate: &mut Gate,
        _: &Transition<Door, Push>,
    ) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock();
        inner.calls.push("before");
        gate.log.push("oiled".to_string());
        if inner.fail_before {
            return Err(ControllerError::ExternalService("no oil".to_string()));
        }
        Ok(())
    }

    async fn after_transition(
        &self,
        _: &Gate,
        _: &Transition<Door, Push>,
    ) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock();
        inner.calls.push("after");
        if inner.fail_after {
            return Err(ControllerError::ExternalService("alarm".to_string()));
        }
        Ok(())
    }
}

fn gate(state: Door) -> Gate {
    Gate {
        name: "front".to_string(),
        state,
        log: Vec::new(),
    }
}

/// Commit sink that records every committed entity.
fn committed() -> (Arc<Mutex<Vec<Gate>>>, impl Fn(&Gate) -> Result<(), ControllerError>) {
    let store = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&store);
    (store, move |g: &Gate| {
        sink.lock().push(g.clone());
        Ok(())
    })
}

#[tokio::test]
async fn fire_runs_hooks_in_order_and_commits() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    let (store, commit) = committed();

    let result = machine
        .fire(
            &hooks,
            &gate(Door::Closed),
            Push::Open,
            Origin::Client,
            "ana",
            7,
            commit,
        )
        .await
        .unwrap();

    assert_eq!(result.state, Door::Open);
    assert_eq!(
        result.log,
        vec!["oiled".to_string(), "7 ana Open".to_string()]
    );
    assert_eq!(hooks.calls(), vec!["validate", "before", "after"]);
    assert_eq!(store.lock().clone(), vec![result]);
}

#[tokio::test]
async fn undefined_trigger_is_invalid_and_skips_hooks() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    let (store, commit) = committed();

    let err = machine
        .fire(
            &hooks,
            &gate(Door::Open),
            Push::Lock,
            Origin::Client,
            "ana",
            1,
            commit,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::InvalidTransition(_)));
    assert!(hooks.calls().is_empty());
    assert!(store.lock().is_empty());
}

#[tokio::test]
async fn internal_trigger_refused_from_client() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    let (store, commit) = committed();

    let err = machine
        .fire(
            &hooks,
            &gate(Door::Locked),
            Push::Service,
            Origin::Client,
            "ana",
            1,
            commit,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::InvalidTransition(_)));
    assert!(store.lock().is_empty());

    let (_, commit) = committed();
    let serviced = machine
        .fire(
            &hooks,
            &gate(Door::Locked),
            Push::Service,
            Origin::Worker,
            "automatic",
            2,
            commit,
        )
        .await
        .unwrap();
    assert_eq!(serviced.state, Door::Closed);
}

#[tokio::test]
async fn guard_failure_keeps_itemized_reasons() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    hooks.inner.lock().fail_validate = true;
    let (store, commit) = committed();

    let err = machine
        .fire(
            &hooks,
            &gate(Door::Closed),
            Push::Open,
            Origin::Client,
            "ana",
            1,
            commit,
        )
        .await
        .unwrap_err();

    match err {
        ControllerError::GuardFailed(reasons) => assert_eq!(reasons.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(hooks.calls(), vec!["validate"]);
    assert!(store.lock().is_empty());
}

#[tokio::test]
async fn before_failure_commits_nothing() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    hooks.inner.lock().fail_before = true;
    let (store, commit) = committed();
    let original = gate(Door::Closed);

    let err = machine
        .fire(
            &hooks,
            &original,
            Push::Open,
            Origin::Client,
            "ana",
            1,
            commit,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::ExternalService(_)));
    assert!(store.lock().is_empty());
    assert_eq!(original.log, Vec::<String>::new());
}

#[tokio::test]
async fn after_failure_restores_original() {
    let machine = StateMachine::<GateLifecycle>::new();
    let hooks = RecordingHooks::default();
    hooks.inner.lock().fail_after = true;
    let (store, commit) = committed();
    let original = gate(Door::Closed);

    machine
        .fire(
            &hooks,
            &original,
            Push::Open,
            Origin::Client,
            "ana",
            1,
            commit,
        )
        .await
        .unwrap_err();

    let commits = store.lock().clone();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].state, Door::Open);
    assert_eq!(commits[1], original);
}

struct NoHooks;

#[async_trait]
impl TransitionHooks<RelvalLifecycle> for NoHooks {
    async fn validate(
        &self,
        _: &Relval,
        _: &Transition<RelvalStatus, Trigger>,
    ) -> Result<(), ControllerError> {
        Ok(())
    }

    async fn before_transition(
        &self,
        _: &mut Relval,
        _: &Transition<RelvalStatus, Trigger>,
    ) -> Result<(), ControllerError> {
        Ok(())
    }

    async fn after_transition(
        &self,
        _: &Relval,
        _: &Transition<RelvalStatus, Trigger>,
    ) -> Result<(), ControllerError> {
        Ok(())
    }
}

fn any_status() -> impl Strategy<Value = RelvalStatus> {
    proptest::sample::select(RelvalStatus::ALL.to_vec())
}

fn any_trigger() -> impl Strategy<Value = Trigger> {
    proptest::sample::select(Trigger::ALL.to_vec())
}

proptest! {
    #[test]
    fn relval_machine_is_total(status in any_status(), trigger in any_trigger()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let machine = StateMachine::<RelvalLifecycle>::new();
        let original = relval("REL-00001", status);
        let commits = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&commits);

        let result = runtime.block_on(machine.fire(
            &NoHooks,
            &original,
            trigger,
            Origin::Worker,
            "automatic",
            10,
            move |_| {
                *counter.lock() += 1;
                Ok(())
            },
        ));

        match RelvalLifecycle::resolve(status, trigger) {
            Ok(edge) => {
                let updated = result.unwrap();
                prop_assert_eq!(updated.status, edge.to);
                prop_assert_eq!(*commits.lock(), 1);
            }
            Err(_) => {
                prop_assert!(matches!(result, Err(ControllerError::InvalidTransition(_))));
                prop_assert_eq!(*commits.lock(), 0);
                prop_assert_eq!(original.status, status);
            }
        }
    }
}
