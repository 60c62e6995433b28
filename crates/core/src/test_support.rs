// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    DriverSpec, GpuSpec, InputSpec, Relval, RelvalId, RelvalStatus, Step, StepSpec, Workflow,
    WorkflowStatus,
};

/// A RelVal in `status` with no steps.
pub fn relval(id: &str, status: RelvalStatus) -> Relval {
    Relval {
        id: RelvalId::new(id),
        cmssw_release: "CMSSW_14_0_0".to_string(),
        batch_name: "fall".to_string(),
        workflow_name: "TTbar".to_string(),
        status,
        steps: Vec::new(),
        workflows: Vec::new(),
        output_datasets: Vec::new(),
        history: Vec::new(),
        campaign_timestamp: 0,
        label: String::new(),
        notes: String::new(),
        jira_ticket: String::new(),
        cpu_cores: 1,
        memory_mb: 2000,
        scram_arch: "el8_amd64_gcc12".to_string(),
        deleted: false,
    }
}

/// An input-dataset step reading `runs` of `dataset`.
pub fn input_step(name: &str, dataset: &str, runs: &[u64]) -> Step {
    Step {
        name: name.to_string(),
        cmssw_release: String::new(),
        scram_arch: String::new(),
        spec: StepSpec::InputDataset(InputSpec {
            dataset: dataset.to_string(),
            runs: runs.to_vec(),
            lumisections: Default::default(),
        }),
        gpu: GpuSpec::default(),
        resolved_conditions: String::new(),
        config_id: String::new(),
    }
}

/// A command-driven step with the given conditions and output tiers.
pub fn driver_step(name: &str, conditions: &str, datatiers: &[&str]) -> Step {
    Step {
        name: name.to_string(),
        cmssw_release: String::new(),
        scram_arch: String::new(),
        spec: StepSpec::CommandDriven(DriverSpec {
            command: format!("cmsDriver.py {}", name),
            conditions: conditions.to_string(),
            pileup_input: String::new(),
            datatiers: datatiers.iter().map(|t| t.to_string()).collect(),
        }),
        gpu: GpuSpec::default(),
        resolved_conditions: String::new(),
        config_id: String::new(),
    }
}

/// A workflow whose history walks through `statuses`, one second apart from `start`.
pub fn workflow(name: &str, statuses: &[&str], start: u64) -> Workflow {
    Workflow {
        name: name.to_string(),
        request_type: "TaskChain".to_string(),
        output_datasets: Vec::new(),
        status_history: statuses
            .iter()
            .enumerate()
            .map(|(i, status)| WorkflowStatus {
                status: status.to_string(),
                time: start + i as u64,
            })
            .collect(),
    }
}
