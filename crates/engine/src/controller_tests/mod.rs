// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller tests

mod approve;
mod edit;
mod finish;
mod rollback;
mod submission;

use super::*;
use rv_adapters::{
    CommandOutput, FakeDatasetCatalog, FakeJobManager, FakeNotifyAdapter, FakeRemoteExecutor,
    JobRecord,
};
use rv_core::test_support::{driver_step, input_step, relval};
use rv_core::{FakeClock, Workflow, WorkflowStatus};
use rv_storage::MemoryStore;
use std::time::Duration;

type TestController = RelvalController<
    MemoryStore,
    FakeRemoteExecutor,
    FakeJobManager,
    FakeDatasetCatalog,
    FakeNotifyAdapter,
    FakeClock,
>;

/// Controller plus handles on every fake behind it
struct TestContext {
    ctl: TestController,
    store: MemoryStore,
    remote: FakeRemoteExecutor,
    jobs: FakeJobManager,
    catalog: FakeDatasetCatalog,
    notifier: FakeNotifyAdapter,
    clock: FakeClock,
}

const RAW: &str = "/RelValTTbar/Run2024A-v1/RAW";
const USER: &str = "operator";

fn setup() -> TestContext {
    let store = MemoryStore::in_memory();
    let remote = FakeRemoteExecutor::new();
    let jobs = FakeJobManager::new();
    let catalog = FakeDatasetCatalog::new();
    let notifier = FakeNotifyAdapter::new();
    let clock = FakeClock::new();
    let config = EngineConfig {
        workers: 2,
        approve_delay: Duration::ZERO,
        recipients: vec!["relval-team@example.org".to_string()],
        service_url: "https://rvt.example.org".to_string(),
        ..EngineConfig::default()
    };
    let ctl = RelvalController::new(
        ControllerDeps {
            store: store.clone(),
            remote: remote.clone(),
            jobs: jobs.clone(),
            catalog: catalog.clone(),
            notifier: notifier.clone(),
        },
        clock.clone(),
        config,
    );
    TestContext {
        ctl,
        store,
        remote,
        jobs,
        catalog,
        notifier,
        clock,
    }
}

impl TestContext {
    fn save(&self, relval: &Relval) {
        self.store.save(relval).unwrap();
    }

    fn load(&self, id: &str) -> Relval {
        self.ctl.get(&RelvalId::new(id)).unwrap()
    }

    fn now(&self) -> u64 {
        self.clock.epoch_secs()
    }

    /// An input step reading run 12345 followed by a generator step,
    /// with the input dataset valid in the catalog.
    fn input_chain(&self, id: &str, status: RelvalStatus) -> Relval {
        let mut rv = relval(id, status);
        rv.steps = vec![
            input_step("input", RAW, &[12345]),
            driver_step("RECO", "140X_dataRun3_v1", &["RECO", "DQMIO"]),
        ];
        if status != RelvalStatus::New {
            rv.steps[1].resolved_conditions = "140X_dataRun3_v1".to_string();
        }
        self.catalog.add_dataset(RAW, "VALID");
        self.catalog.set_runs(RAW, vec![12344, 12345]);
        self.save(&rv);
        rv
    }

    /// Make the upload script print a config id for every generated config.
    fn upload_succeeds(&self, ids: &[(&str, &str)]) {
        let stdout: String = ids
            .iter()
            .map(|(label, hash)| format!("DocID {} {}\n", label, hash))
            .collect();
        self.remote
            .respond(crate::scripts::UPLOAD_SCRIPT, CommandOutput::ok(stdout));
    }

    async fn next(&self, ids: &[&str]) -> BatchResult {
        let ids: Vec<RelvalId> = ids.iter().map(|id| RelvalId::new(*id)).collect();
        self.ctl.next_status(&ids, USER).await
    }

    async fn next_one(&self, id: &str) -> Result<Relval, ControllerError> {
        let mut results = self.next(&[id]).await;
        assert_eq!(results.len(), 1);
        results.remove(0).1
    }

    /// Poll until `check` holds for the stored RelVal.
    async fn wait_for(&self, id: &str, check: impl Fn(&Relval) -> bool) -> Relval {
        for _ in 0..500 {
            let relval = self.load(id);
            if check(&relval) {
                return relval;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition on {} never held: {:?}", id, self.load(id));
    }

    /// Poll until no submission is queued or running.
    async fn settle(&self) {
        for _ in 0..500 {
            let busy = self
                .ctl
                .worker_status()
                .iter()
                .any(|w| w.current_task.is_some());
            if !busy && self.ctl.queued_names().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("submission queue never drained");
    }
}

fn record(name: &str, prep_id: &str, outputs: &[&str], statuses: &[(&str, u64)]) -> JobRecord {
    JobRecord {
        name: name.to_string(),
        request_type: "TaskChain".to_string(),
        prep_id: prep_id.to_string(),
        output_datasets: outputs.iter().map(|d| d.to_string()).collect(),
        transitions: statuses
            .iter()
            .map(|(status, time)| WorkflowStatus {
                status: status.to_string(),
                time: *time,
            })
            .collect(),
    }
}

fn history_has(relval: &Relval, action: &str, value: &str) -> bool {
    relval
        .history
        .iter()
        .any(|h| h.action == action && h.value == value)
}

#[yare::parameterized(
    new = { RelvalStatus::New, Some(Trigger::Approve) },
    approved = { RelvalStatus::Approved, Some(Trigger::Submit) },
    submitting = { RelvalStatus::Submitting, None },
    submitted = { RelvalStatus::Submitted, Some(Trigger::Complete) },
    done = { RelvalStatus::Done, None },
    archived = { RelvalStatus::Archived, Some(Trigger::Complete) },
)]
fn next_follows_the_transition_table(status: RelvalStatus, expected: Option<Trigger>) {
    assert_eq!(forward_trigger(status), expected);
}
