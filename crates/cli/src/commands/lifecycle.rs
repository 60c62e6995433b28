// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status commands: next, previous, refresh

use anyhow::Result;
use rv_core::{RelvalId, RelvalStatus};
use rv_engine::BatchResult;

use crate::app::Controller;
use crate::exit_error::ExitError;
use crate::output::{print_batch, print_json, OutputFormat};

fn to_ids(ids: &[String]) -> Vec<RelvalId> {
    ids.iter().map(|id| RelvalId::new(id.as_str())).collect()
}

/// Ids whose submission was queued by this batch.
pub(crate) fn queued_submissions(results: &BatchResult) -> Vec<RelvalId> {
    results
        .iter()
        .filter_map(|(id, result)| match result {
            Ok(relval) if relval.status.is_transient() => Some(id.clone()),
            _ => None,
        })
        .collect()
}

fn batch_outcome(failed: usize, total: usize) -> Result<()> {
    if failed > 0 {
        return Err(ExitError::new(1, format!("{} of {} failed", failed, total)).into());
    }
    Ok(())
}

/// Move each RelVal to its next status.
///
/// Submissions run in this process, so the command waits for them and
/// reports where they ended up. A submission that was reverted counts as
/// a failure.
pub async fn next(
    ids: &[String],
    ctl: &Controller,
    user: &str,
    format: OutputFormat,
) -> Result<()> {
    let mut results = ctl.next_status(&to_ids(ids), user).await;
    let queued = queued_submissions(&results);
    if queued.is_empty() {
        let failed = print_batch(&results, format)?;
        return batch_outcome(failed, results.len());
    }

    if format == OutputFormat::Text {
        print_batch(&results, format)?;
        eprintln!("Waiting for {} submission(s)...", queued.len());
    }
    ctl.shutdown().await;
    for (id, result) in results.iter_mut() {
        if queued.contains(id) {
            *result = ctl.get(id);
        }
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count()
        + unsubmitted(&results, &queued);
    match format {
        OutputFormat::Text => {
            let finished: BatchResult = results
                .into_iter()
                .filter(|(id, _)| queued.contains(id))
                .collect();
            print_batch(&finished, format)?;
            batch_outcome(failed, ids.len())
        }
        OutputFormat::Json => {
            print_batch(&results, format)?;
            batch_outcome(failed, results.len())
        }
    }
}

/// Queued submissions that did not reach `submitted`.
pub(crate) fn unsubmitted(results: &BatchResult, queued: &[RelvalId]) -> usize {
    results
        .iter()
        .filter(|(id, result)| {
            queued.contains(id)
                && matches!(result, Ok(relval) if relval.status != RelvalStatus::Submitted)
        })
        .count()
}

pub async fn previous(
    ids: &[String],
    ctl: &Controller,
    user: &str,
    format: OutputFormat,
) -> Result<()> {
    let results = ctl.previous_status(&to_ids(ids), user).await;
    let failed = print_batch(&results, format)?;
    batch_outcome(failed, results.len())
}

/// Re-fetch workflows and output datasets from the job manager.
pub async fn refresh(ids: &[String], ctl: &Controller, format: OutputFormat) -> Result<()> {
    let mut results: BatchResult = Vec::with_capacity(ids.len());
    for id in to_ids(ids) {
        let result = ctl.refresh_workflows(&id).await;
        results.push((id, result));
    }
    match format {
        OutputFormat::Json => {
            let docs: Vec<_> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
            print_json(&docs)?;
            for (id, result) in &results {
                if let Err(e) = result {
                    eprintln!("{}: {}", id, e);
                }
            }
        }
        OutputFormat::Text => {
            for (id, result) in &results {
                match result {
                    Ok(relval) => println!(
                        "{}  {} workflow(s), {} output dataset(s)",
                        id,
                        relval.workflows.len(),
                        relval.output_datasets.len()
                    ),
                    Err(e) => println!(
                        "{}  {}",
                        id,
                        crate::color::status(&format!("failed: {}", e))
                    ),
                }
            }
        }
    }
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    batch_outcome(failed, results.len())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
