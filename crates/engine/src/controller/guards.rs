// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preconditions checked before approval and submission.
//!
//! Every check produces one readable reason per failing step or field so an
//! operator can fix them all in one pass.

use crate::error::ControllerError;
use rv_adapters::DatasetCatalog;
use rv_core::{normalize_dataset, Relval, StepSpec, VALID_ACCESS_TYPE};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A batch-wide lookup that failed; every RelVal depending on it reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PrefetchFailure {
    Remote { exit_code: i32, stderr: String },
    Service(String),
}

impl PrefetchFailure {
    pub(crate) fn to_error(&self) -> ControllerError {
        match self {
            PrefetchFailure::Remote { exit_code, stderr } => {
                ControllerError::RemoteExecutionFailed {
                    exit_code: *exit_code,
                    stderr: stderr.clone(),
                }
            }
            PrefetchFailure::Service(message) => ControllerError::ExternalService(message.clone()),
        }
    }
}

impl From<ControllerError> for PrefetchFailure {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::RemoteExecutionFailed { exit_code, stderr } => {
                PrefetchFailure::Remote { exit_code, stderr }
            }
            other => PrefetchFailure::Service(other.to_string()),
        }
    }
}

/// `"<id> step <n>: <field> not set"` for each missing GPU parameter.
pub(crate) fn gpu_reasons(relval: &Relval) -> Vec<String> {
    relval
        .steps
        .iter()
        .enumerate()
        .flat_map(|(index, step)| {
            step.gpu
                .missing_parameters()
                .into_iter()
                .map(move |field| format!("{} step {}: {} not set", relval.id, index + 1, field))
        })
        .collect()
}

/// Requested runs of each input step that the catalog does not have at all.
pub(crate) async fn run_reasons<D: DatasetCatalog>(
    catalog: &D,
    relval: &Relval,
) -> Result<Vec<String>, ControllerError> {
    let mut reasons = Vec::new();
    for (index, step) in relval.steps.iter().enumerate() {
        let StepSpec::InputDataset(input) = &step.spec else {
            continue;
        };
        let requested = input.requested_runs();
        if requested.is_empty() {
            continue;
        }
        let Some(dataset) = normalize_dataset(&input.dataset) else {
            reasons.push(format!("{} step {}: no input dataset", relval.id, index + 1));
            continue;
        };
        let available: BTreeSet<u64> = catalog.runs(&dataset).await?.into_iter().collect();
        if !requested.iter().any(|run| available.contains(run)) {
            let runs: Vec<String> = requested.iter().map(u64::to_string).collect();
            reasons.push(format!(
                "{} step {}: runs {} are not in dataset {}",
                relval.id,
                index + 1,
                runs.join(", "),
                dataset
            ));
        }
    }
    Ok(reasons)
}

/// Input datasets that are unknown to the catalog or not valid.
pub(crate) fn dataset_reasons(
    relval: &Relval,
    access_types: &HashMap<String, String>,
) -> Vec<String> {
    relval
        .input_datasets()
        .into_iter()
        .filter_map(|dataset| match access_types.get(&dataset) {
            None => Some(format!("could not get status of dataset {}", dataset)),
            Some(access) if !access.eq_ignore_ascii_case(VALID_ACCESS_TYPE) => Some(format!(
                "{} type is {}, it must be {}",
                dataset,
                access,
                VALID_ACCESS_TYPE.to_uppercase()
            )),
            Some(_) => None,
        })
        .collect()
}

/// `(release, arch)` -> auto condition keys to resolve there.
pub(crate) type ConditionsTree = BTreeMap<(String, String), BTreeSet<String>>;

/// Auto conditions used by command-driven steps, grouped by environment.
pub(crate) fn wanted_conditions(relvals: &[Relval]) -> ConditionsTree {
    let mut tree = ConditionsTree::new();
    for relval in relvals {
        for step in &relval.steps {
            if let StepSpec::CommandDriven(driver) = &step.spec {
                if let Some(key) = driver.auto_conditions() {
                    tree.entry((
                        relval.release_of(step).to_string(),
                        relval.arch_of(step).to_string(),
                    ))
                    .or_default()
                    .insert(key.to_string());
                }
            }
        }
    }
    tree
}

/// Parse `<auto-key> <value>` lines; anything else is ignored.
pub(crate) fn parse_resolved(stdout: &str) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let key = parts.next()?;
            let value = parts.next()?;
            key.starts_with(rv_core::AUTO_CONDITIONS_PREFIX)
                .then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Outcome of resolving a batch's auto conditions.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedConditions {
    values: HashMap<(String, String, String), String>,
    failures: HashMap<(String, String), PrefetchFailure>,
}

impl ResolvedConditions {
    pub(crate) fn insert(&mut self, release: &str, arch: &str, key: &str, value: &str) {
        self.values.insert(
            (release.to_string(), arch.to_string(), key.to_string()),
            value.to_string(),
        );
    }

    pub(crate) fn fail(&mut self, release: &str, arch: &str, failure: PrefetchFailure) {
        self.failures
            .insert((release.to_string(), arch.to_string()), failure);
    }

    fn get(&self, release: &str, arch: &str, key: &str) -> Option<&str> {
        self.values
            .get(&(release.to_string(), arch.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// First environment-wide failure affecting `relval`, if any.
    pub(crate) fn failure_for(&self, relval: &Relval) -> Option<&PrefetchFailure> {
        wanted_conditions(std::slice::from_ref(relval))
            .keys()
            .find_map(|env| self.failures.get(env))
    }

    /// Auto conditions of `relval` that did not resolve.
    pub(crate) fn reasons(&self, relval: &Relval) -> Vec<String> {
        let mut reasons = Vec::new();
        for (index, step) in relval.steps.iter().enumerate() {
            let StepSpec::CommandDriven(driver) = &step.spec else {
                continue;
            };
            if let Some(key) = driver.auto_conditions() {
                if self
                    .get(relval.release_of(step), relval.arch_of(step), key)
                    .is_none()
                {
                    reasons.push(format!(
                        "{} step {}: cannot resolve {} in {} {}",
                        relval.id,
                        index + 1,
                        key,
                        relval.release_of(step),
                        relval.arch_of(step)
                    ));
                }
            }
        }
        reasons
    }

    /// Copy concrete conditions into every command-driven step.
    pub(crate) fn apply(&self, relval: &mut Relval) {
        let resolved: Vec<Option<String>> = relval
            .steps
            .iter()
            .map(|step| match &step.spec {
                StepSpec::InputDataset(_) => None,
                StepSpec::CommandDriven(driver) => Some(match driver.auto_conditions() {
                    Some(key) => self
                        .get(relval.release_of(step), relval.arch_of(step), key)
                        .unwrap_or_default()
                        .to_string(),
                    None => driver.conditions.clone(),
                }),
            })
            .collect();
        for (step, value) in relval.steps.iter_mut().zip(resolved) {
            if let Some(value) = value {
                step.resolved_conditions = value;
            }
        }
    }
}

#[cfg(test)]
#[path = "guards_tests.rs"]
mod tests;
