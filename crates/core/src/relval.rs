// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RelVal document model: steps, remote workflows, and the audit history.

use crate::id::RelvalId;
use crate::status::RelvalStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow statuses after which a workflow is no longer active.
pub const DEAD_WORKFLOW_STATUSES: &[&str] = &[
    "rejected",
    "aborted",
    "failed",
    "rejected-archived",
    "aborted-archived",
    "failed-archived",
    "aborted-completed",
];

/// Workflow status that marks successful completion.
pub const COMPLETED_WORKFLOW_STATUS: &str = "completed";

/// Terminal archived-like workflow statuses.
pub const ARCHIVED_WORKFLOW_STATUSES: &[&str] =
    &["normal-archived", "rejected-archived", "aborted-archived"];

/// Statuses of workflows that hold resources; these are aborted, not rejected.
pub const RUNNING_WORKFLOW_STATUSES: &[&str] = &[
    "assigned",
    "staging",
    "staged",
    "acquired",
    "running-open",
    "running-closed",
];

/// Catalog access type of a usable dataset.
pub const VALID_ACCESS_TYPE: &str = "valid";

/// A tracked release-validation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relval {
    pub id: RelvalId,
    pub cmssw_release: String,
    #[serde(default)]
    pub batch_name: String,
    #[serde(default)]
    pub workflow_name: String,
    pub status: RelvalStatus,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Remote jobs, appended in submission order.
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub output_datasets: Vec<String>,
    /// Append-only audit log.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Epoch seconds grouping RelVals submitted together; 0 means unset.
    #[serde(default)]
    pub campaign_timestamp: u64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub jira_ticket: String,
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: u32,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,
    #[serde(default)]
    pub scram_arch: String,
    /// Tombstone; deleted documents are kept but never served.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

fn default_cpu_cores() -> u32 {
    1
}

fn default_memory_mb() -> u32 {
    2000
}

impl Relval {
    /// Append a history entry, keeping entry times non-decreasing.
    pub fn add_history(
        &mut self,
        action: &str,
        value: impl Into<serde_json::Value>,
        user: &str,
        time: u64,
    ) {
        let floor = self.history.last().map(|h| h.time).unwrap_or(0);
        self.history.push(HistoryEntry {
            action: action.to_string(),
            time: time.max(floor),
            user: user.to_string(),
            value: value.into(),
        });
    }

    /// CMSSW release a step runs in (step override or the RelVal's).
    pub fn release_of<'a>(&'a self, step: &'a Step) -> &'a str {
        if step.cmssw_release.is_empty() {
            &self.cmssw_release
        } else {
            &step.cmssw_release
        }
    }

    /// Scram architecture a step runs with (step override or the RelVal's).
    pub fn arch_of<'a>(&'a self, step: &'a Step) -> &'a str {
        if step.scram_arch.is_empty() {
            &self.scram_arch
        } else {
            &step.scram_arch
        }
    }

    /// Datasets the RelVal reads: input datasets and pileup inputs.
    pub fn input_datasets(&self) -> Vec<String> {
        let mut datasets = Vec::new();
        for step in &self.steps {
            let raw = match &step.spec {
                StepSpec::InputDataset(input) => input.dataset.as_str(),
                StepSpec::CommandDriven(driver) => driver.pileup_input.as_str(),
            };
            if let Some(dataset) = normalize_dataset(raw) {
                if !datasets.contains(&dataset) {
                    datasets.push(dataset);
                }
            }
        }
        datasets
    }

    /// Data tiers produced by command-driven steps, in step order.
    pub fn datatiers(&self) -> Vec<String> {
        let mut tiers = Vec::new();
        for step in &self.steps {
            if let StepSpec::CommandDriven(driver) = &step.spec {
                tiers.extend(driver.datatiers.iter().cloned());
            }
        }
        tiers
    }

    pub fn clear_config_ids(&mut self) {
        for step in &mut self.steps {
            step.config_id.clear();
        }
    }

    pub fn clear_resolved_conditions(&mut self) {
        for step in &mut self.steps {
            step.resolved_conditions.clear();
        }
    }

    /// Workflows that were not created as resubmissions.
    pub fn primary_workflows(&self) -> impl Iterator<Item = &Workflow> {
        self.workflows.iter().filter(|w| !w.is_resubmission())
    }
}

/// Strip anything before the first `/` (e.g. an `input:` prefix).
///
/// Returns `None` for an empty or slash-less value.
pub fn normalize_dataset(raw: &str) -> Option<String> {
    let start = raw.find('/')?;
    Some(raw[start..].trim().to_string())
}

/// One step of a RelVal. Owned by exactly one RelVal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    /// Release override; empty means the RelVal's release.
    #[serde(default)]
    pub cmssw_release: String,
    #[serde(default)]
    pub scram_arch: String,
    pub spec: StepSpec,
    #[serde(default)]
    pub gpu: GpuSpec,
    /// Concrete conditions; set on approval, cleared on reset.
    #[serde(default)]
    pub resolved_conditions: String,
    /// Uploaded config id; only meaningful while submitting or submitted.
    #[serde(default)]
    pub config_id: String,
}

impl Step {
    pub fn is_input(&self) -> bool {
        matches!(self.spec, StepSpec::InputDataset(_))
    }

    /// Config file name (without extension) a command-driven step generates.
    pub fn config_file_name(&self, index: usize) -> Option<String> {
        match self.spec {
            StepSpec::InputDataset(_) => None,
            StepSpec::CommandDriven(_) => Some(format!("step_{}_cfg", index + 1)),
        }
    }
}

/// Step type discriminator with its type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepSpec {
    InputDataset(InputSpec),
    CommandDriven(DriverSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub dataset: String,
    #[serde(default)]
    pub runs: Vec<u64>,
    /// Run number -> lumisection ranges.
    #[serde(default)]
    pub lumisections: BTreeMap<String, Vec<(u64, u64)>>,
}

impl InputSpec {
    /// Runs requested, from the explicit run list or else the lumisection mask.
    pub fn requested_runs(&self) -> Vec<u64> {
        if !self.runs.is_empty() {
            return self.runs.clone();
        }
        self.lumisections
            .keys()
            .filter_map(|run| run.parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    /// Configuration generation command for this step.
    pub command: String,
    /// Conditions; `auto:<key>` values are resolved on approval.
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub pileup_input: String,
    #[serde(default)]
    pub datatiers: Vec<String>,
}

impl DriverSpec {
    pub fn auto_conditions(&self) -> Option<&str> {
        self.conditions
            .starts_with(AUTO_CONDITIONS_PREFIX)
            .then_some(self.conditions.as_str())
    }
}

pub const AUTO_CONDITIONS_PREFIX: &str = "auto:";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuRequirement {
    #[default]
    Forbidden,
    Optional,
    Required,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSpec {
    #[serde(default)]
    pub requires: GpuRequirement,
    #[serde(default)]
    pub gpu_memory: Option<u32>,
    #[serde(default)]
    pub cuda_capabilities: Vec<String>,
    #[serde(default)]
    pub cuda_runtime: String,
}

impl GpuSpec {
    /// Names of the GPU parameters a GPU-capable step is missing.
    pub fn missing_parameters(&self) -> Vec<&'static str> {
        if self.requires == GpuRequirement::Forbidden {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if self.gpu_memory.unwrap_or(0) == 0 {
            missing.push("gpu_memory");
        }
        if self.cuda_capabilities.is_empty() {
            missing.push("cuda_capabilities");
        }
        if self.cuda_runtime.is_empty() {
            missing.push("cuda_runtime");
        }
        missing
    }
}

/// A job in the remote job-management service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(rename = "type", default)]
    pub request_type: String,
    #[serde(default)]
    pub output_datasets: Vec<OutputDataset>,
    #[serde(default)]
    pub status_history: Vec<WorkflowStatus>,
}

impl Workflow {
    /// A freshly submitted workflow with no known history yet.
    pub fn submitted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_type: String::new(),
            output_datasets: Vec::new(),
            status_history: Vec::new(),
        }
    }

    pub fn is_resubmission(&self) -> bool {
        self.request_type.eq_ignore_ascii_case("resubmission")
    }

    /// Whether the workflow ever entered a dead status.
    pub fn is_dead(&self) -> bool {
        self.status_history
            .iter()
            .any(|s| DEAD_WORKFLOW_STATUSES.contains(&s.status.as_str()))
    }

    pub fn last_status(&self) -> Option<&str> {
        self.status_history.last().map(|s| s.status.as_str())
    }

    /// Time the workflow first entered any of `statuses`.
    pub fn first_time_in(&self, statuses: &[&str]) -> Option<u64> {
        self.status_history
            .iter()
            .find(|s| statuses.contains(&s.status.as_str()))
            .map(|s| s.time)
    }

    /// Output datasets whose catalog access type is not valid.
    pub fn invalid_outputs(&self) -> Vec<&str> {
        self.output_datasets
            .iter()
            .filter(|d| !d.access_type.eq_ignore_ascii_case(VALID_ACCESS_TYPE))
            .map(|d| d.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataset {
    pub name: String,
    #[serde(default)]
    pub access_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub status: String,
    pub time: u64,
}

/// Immutable audit-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub time: u64,
    pub user: String,
    pub value: serde_json::Value,
}

#[cfg(test)]
#[path = "relval_tests.rs"]
mod tests;
