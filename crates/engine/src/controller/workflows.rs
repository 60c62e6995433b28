// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote workflow bookkeeping: refresh from the job manager, output
//! dataset selection, rejection on rollback, and the done/archived decision.

use super::RelvalController;
use crate::error::ControllerError;
use rv_adapters::{DatasetCatalog, JobManager, JobRecord, NotifyAdapter, RemoteExecutor};
use rv_core::{
    Clock, LockOwner, OutputDataset, Relval, RelvalId, RelvalStatus, Workflow, WorkflowStatus,
    ARCHIVED_WORKFLOW_STATUSES, COMPLETED_WORKFLOW_STATUS, DEAD_WORKFLOW_STATUSES,
    RUNNING_WORKFLOW_STATUSES,
};
use rv_storage::RelvalStore;
use std::collections::{BTreeMap, HashMap};

/// Access type recorded for outputs the catalog does not know yet.
const UNKNOWN_ACCESS_TYPE: &str = "unknown";

fn record_is_dead(record: &JobRecord) -> bool {
    record
        .transitions
        .iter()
        .any(|t| DEAD_WORKFLOW_STATUSES.contains(&t.status.as_str()))
}

fn record_is_resubmission(record: &JobRecord) -> bool {
    record.request_type.eq_ignore_ascii_case("resubmission")
}

/// Latest output dataset per (tier, name without version), ordered by the
/// position of its tier in `datatiers`.
///
/// Resubmissions and dead workflows are ignored.
pub(crate) fn select_output_datasets(datatiers: &[String], records: &[JobRecord]) -> Vec<String> {
    let mut tree: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for record in records {
        if record_is_resubmission(record) || record_is_dead(record) {
            tracing::debug!(workflow = %record.name, "ignoring workflow outputs");
            continue;
        }
        for dataset in &record.output_datasets {
            let parts: Vec<&str> = dataset.split('/').map(str::trim).collect();
            let Some((tier, rest)) = parts.split_last() else {
                continue;
            };
            if !datatiers.iter().any(|t| t == tier) {
                continue;
            }
            let without_tier = rest.join("/");
            let without_version = match without_tier.rsplit_once('-') {
                Some((name, _version)) => name.to_string(),
                None => String::new(),
            };
            tree.entry((tier.to_string(), without_version))
                .or_default()
                .push(dataset.clone());
        }
    }

    let mut selected: Vec<String> = tree
        .into_values()
        .filter_map(|mut versions| {
            versions.sort();
            versions.pop()
        })
        .collect();
    let tier_index = |dataset: &String| {
        let tier = dataset.rsplit('/').next().unwrap_or_default();
        datatiers.iter().position(|t| t == tier)
    };
    selected.sort_by_key(tier_index);
    selected
}

/// Sort key: the last three `_`-separated parts of the workflow name.
pub(crate) fn workflow_sort_key(name: &str) -> String {
    let parts: Vec<&str> = name.split('_').collect();
    parts[parts.len().saturating_sub(3)..].join("_")
}

/// Workflows from fresh job records, keeping known workflows the job manager
/// no longer reports.
pub(crate) fn merge_workflows(
    known: &[Workflow],
    records: &[JobRecord],
    outputs: &[String],
    access_types: &HashMap<String, String>,
) -> Vec<Workflow> {
    let mut workflows: Vec<Workflow> = records
        .iter()
        .map(|record| Workflow {
            name: record.name.clone(),
            request_type: record.request_type.clone(),
            output_datasets: outputs
                .iter()
                .filter(|dataset| record.output_datasets.contains(dataset))
                .map(|dataset| OutputDataset {
                    name: dataset.clone(),
                    access_type: access_types
                        .get(dataset)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_ACCESS_TYPE.to_string()),
                })
                .collect(),
            status_history: record
                .transitions
                .iter()
                .map(|t| WorkflowStatus {
                    status: t.status.clone(),
                    time: t.time,
                })
                .collect(),
        })
        .collect();
    for workflow in known {
        if !workflows.iter().any(|w| w.name == workflow.name) {
            tracing::info!(workflow = %workflow.name, "workflow not reported by job manager");
            workflows.push(workflow.clone());
        }
    }
    workflows.sort_by_key(|w| workflow_sort_key(&w.name));
    workflows
}

/// Workflows that never entered a dead status.
pub(crate) fn active_workflows(relval: &Relval) -> Vec<&Workflow> {
    relval.workflows.iter().filter(|w| !w.is_dead()).collect()
}

/// Status an active workflow is moved to when its RelVal is rolled back.
pub(crate) fn rejection_status(workflow: &Workflow) -> &'static str {
    match workflow.last_status() {
        Some(status) if RUNNING_WORKFLOW_STATUSES.contains(&status) => "aborted",
        _ => "rejected",
    }
}

/// Where a submitted or archived RelVal can move next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    /// Completed with valid outputs, at the completion time.
    Complete(u64),
    /// Archived before `cutoff` without valid outputs, at the archive time.
    Archive(u64),
}

/// Decide from the last primary workflow whether `relval` is done or
/// archived, or list why it is neither.
pub(crate) fn finish_decision(relval: &Relval, cutoff: u64) -> Result<Finish, Vec<String>> {
    let Some(last) = relval.primary_workflows().last() else {
        return Err(vec![format!(
            "{} does not have any workflows in the job manager",
            relval.id
        )]);
    };
    let invalid = last.invalid_outputs();
    let completed = last.first_time_in(&[COMPLETED_WORKFLOW_STATUS]);
    if let (true, Some(time)) = (invalid.is_empty(), completed) {
        return Ok(Finish::Complete(time));
    }

    let archived = last.first_time_in(ARCHIVED_WORKFLOW_STATUSES);
    if relval.status == RelvalStatus::Submitted {
        if let Some(time) = archived.filter(|t| *t <= cutoff) {
            return Ok(Finish::Archive(time));
        }
    }

    let mut reasons = Vec::new();
    if !invalid.is_empty() {
        let tiers: Vec<&str> = invalid
            .iter()
            .map(|d| d.rsplit('/').next().unwrap_or(d))
            .collect();
        reasons.push(format!(
            "cannot move {} to done: {} datasets are not VALID: {}",
            relval.id,
            invalid.len(),
            tiers.join(", ")
        ));
    }
    if completed.is_none() {
        reasons.push(format!(
            "cannot move {} to done: {} is not yet {}",
            relval.id, last.name, COMPLETED_WORKFLOW_STATUS
        ));
    }
    if archived.is_some() && relval.status == RelvalStatus::Submitted {
        reasons.push(format!(
            "cannot move {} to archived: {} is not archived long enough",
            relval.id, last.name
        ));
    }
    Err(reasons)
}

impl<S, R, J, D, N, C> RelvalController<S, R, J, D, N, C>
where
    S: RelvalStore,
    R: RemoteExecutor,
    J: JobManager,
    D: DatasetCatalog,
    N: NotifyAdapter,
    C: Clock,
{
    /// Re-read the workflows of `id` from the job manager and save them.
    pub async fn refresh_workflows(&self, id: &RelvalId) -> Result<Relval, ControllerError> {
        self.refresh_as(id, &LockOwner::generate()).await
    }

    /// Refresh while holding the lock of `id` for `owner`.
    pub(crate) async fn refresh_as(
        &self,
        id: &RelvalId,
        owner: &LockOwner,
    ) -> Result<Relval, ControllerError> {
        let _guard = self
            .inner
            .locks
            .acquire(id.as_str(), owner, "workflow refresh")
            .await;
        let mut relval = self.get(id)?;
        self.refresh_into(&mut relval).await?;
        self.inner.store.save(&relval)?;
        Ok(relval)
    }

    /// Replace workflows and output datasets with the job manager's view.
    pub(crate) async fn refresh_into(&self, relval: &mut Relval) -> Result<(), ControllerError> {
        let records = self.inner.jobs.fetch(relval.id.as_str()).await?;
        let outputs = select_output_datasets(&relval.datatiers(), &records);
        let access_types: HashMap<String, String> = if outputs.is_empty() {
            HashMap::new()
        } else {
            self.inner
                .catalog
                .list(&outputs)
                .await?
                .into_iter()
                .map(|d| (d.name, d.access_type))
                .collect()
        };
        relval.workflows = merge_workflows(&relval.workflows, &records, &outputs, &access_types);
        tracing::info!(
            id = %relval.id,
            workflows = relval.workflows.len(),
            outputs = outputs.len(),
            "workflows refreshed"
        );
        relval.output_datasets = outputs;
        Ok(())
    }

    /// Abort running workflows and reject the other active ones.
    ///
    /// Returns how many workflows changed status.
    pub(crate) async fn reject_active(&self, relval: &Relval) -> Result<usize, ControllerError> {
        let active = active_workflows(relval);
        for workflow in &active {
            let status = rejection_status(workflow);
            tracing::info!(id = %relval.id, workflow = %workflow.name, status, "stopping workflow");
            self.inner.jobs.set_status(&workflow.name, status).await?;
        }
        Ok(active.len())
    }

    /// Refresh every submitted RelVal whose lock is free.
    ///
    /// Returns how many were refreshed.
    pub async fn poll_submitted(&self) -> usize {
        let submitted = match self
            .inner
            .store
            .query(&rv_storage::Query::with_status(RelvalStatus::Submitted))
        {
            Ok(page) => page.items,
            Err(e) => {
                tracing::error!(error = %e, "cannot list submitted relvals");
                return 0;
            }
        };
        let mut refreshed = 0;
        for relval in submitted {
            if self.inner.locks.is_locked(relval.id.as_str()) {
                tracing::debug!(id = %relval.id, "locked, skipping refresh");
                continue;
            }
            match self.refresh_workflows(&relval.id).await {
                Ok(_) => refreshed += 1,
                Err(e) => tracing::warn!(id = %relval.id, error = %e, "workflow refresh failed"),
            }
        }
        refreshed
    }
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
