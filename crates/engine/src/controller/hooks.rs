// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RelVal guards and side effects, plugged into the generic state machine.

use super::guards::{
    dataset_reasons, gpu_reasons, run_reasons, PrefetchFailure, ResolvedConditions,
};
use super::RelvalController;
use crate::error::ControllerError;
use crate::machine::TransitionHooks;
use async_trait::async_trait;
use rv_adapters::{DatasetCatalog, JobManager, NotifyAdapter, RemoteExecutor};
use rv_core::{Clock, LockOwner, Relval, RelvalLifecycle, RelvalStatus, Transition, Trigger};
use rv_storage::RelvalStore;
use std::collections::HashMap;

/// Batch-wide lookups made before the per-RelVal locks are taken.
#[derive(Debug, Clone, Default)]
pub(crate) struct HookContext {
    pub(crate) conditions: Option<ResolvedConditions>,
    pub(crate) access_types: Option<Result<HashMap<String, String>, PrefetchFailure>>,
    /// Set when a failed or interrupted submission is being undone; the
    /// value is recorded as the outcome of the submission.
    pub(crate) revert: Option<&'static str>,
}

pub(crate) struct RelvalHooks<'a, S, R, J, D, N, C> {
    ctl: &'a RelvalController<S, R, J, D, N, C>,
    owner: &'a LockOwner,
    context: HookContext,
}

impl<'a, S, R, J, D, N, C> RelvalHooks<'a, S, R, J, D, N, C> {
    pub(crate) fn new(
        ctl: &'a RelvalController<S, R, J, D, N, C>,
        owner: &'a LockOwner,
        context: HookContext,
    ) -> Self {
        Self {
            ctl,
            owner,
            context,
        }
    }
}

type Edge = Transition<RelvalStatus, Trigger>;

impl<S, R, J, D, N, C> RelvalHooks<'_, S, R, J, D, N, C>
where
    S: RelvalStore,
    R: RemoteExecutor,
    J: JobManager,
    D: DatasetCatalog,
    N: NotifyAdapter,
    C: Clock,
{
    async fn approval_reasons(&self, relval: &Relval) -> Result<Vec<String>, ControllerError> {
        let mut reasons = Vec::new();
        if relval.steps.is_empty() {
            reasons.push(format!("{} has no steps", relval.id));
        }
        reasons.extend(gpu_reasons(relval));
        reasons.extend(run_reasons(&self.ctl.inner.catalog, relval).await?);
        let conditions = self.context.conditions.clone().unwrap_or_default();
        if let Some(failure) = conditions.failure_for(relval) {
            return Err(failure.to_error());
        }
        reasons.extend(conditions.reasons(relval));
        Ok(reasons)
    }

    fn submission_reasons(&self, relval: &Relval) -> Result<Vec<String>, ControllerError> {
        if relval.input_datasets().is_empty() {
            return Ok(Vec::new());
        }
        match &self.context.access_types {
            Some(Ok(access_types)) => Ok(dataset_reasons(relval, access_types)),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(dataset_reasons(relval, &HashMap::new())),
        }
    }

    async fn roll_back(&self, relval: &mut Relval, edge: &Edge) -> Result<(), ControllerError> {
        match self.context.revert {
            // The job manager may have taken the job before the failure.
            Some(outcome) => {
                relval.add_history("submission", outcome, "automatic", self.ctl.now());
                if let Err(e) = self.stop_workflows(relval).await {
                    tracing::warn!(
                        id = %relval.id,
                        error = %e,
                        "cannot stop workflows of reverted submission"
                    );
                }
            }
            None if edge.from != RelvalStatus::Approved => self.stop_workflows(relval).await?,
            None => {}
        }
        relval.clear_config_ids();
        relval.campaign_timestamp = 0;
        relval.output_datasets.clear();
        Ok(())
    }

    /// Record the job manager's workflows and stop the active ones.
    async fn stop_workflows(&self, relval: &mut Relval) -> Result<(), ControllerError> {
        self.ctl.refresh_into(relval).await?;
        if self.ctl.reject_active(relval).await? > 0 {
            self.ctl.refresh_into(relval).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S, R, J, D, N, C> TransitionHooks<RelvalLifecycle> for RelvalHooks<'_, S, R, J, D, N, C>
where
    S: RelvalStore,
    R: RemoteExecutor,
    J: JobManager,
    D: DatasetCatalog,
    N: NotifyAdapter,
    C: Clock,
{
    async fn validate(&self, relval: &Relval, edge: &Edge) -> Result<(), ControllerError> {
        let reasons = match edge.trigger {
            Trigger::Approve => self.approval_reasons(relval).await?,
            Trigger::Submit => self.submission_reasons(relval)?,
            _ => Vec::new(),
        };
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::GuardFailed(reasons))
        }
    }

    async fn before_transition(
        &self,
        relval: &mut Relval,
        edge: &Edge,
    ) -> Result<(), ControllerError> {
        match edge.trigger {
            Trigger::Approve => {
                if let Some(conditions) = &self.context.conditions {
                    conditions.apply(relval);
                }
            }
            Trigger::Submit => {
                relval.clear_config_ids();
                relval.campaign_timestamp = self.ctl.campaign_timestamp(relval)?;
            }
            Trigger::Rollback => self.roll_back(relval, edge).await?,
            Trigger::Reset => {
                relval.clear_resolved_conditions();
                relval.clear_config_ids();
            }
            Trigger::Accept | Trigger::Complete | Trigger::Archive => {}
        }
        Ok(())
    }

    async fn after_transition(&self, relval: &Relval, edge: &Edge) -> Result<(), ControllerError> {
        if edge.trigger == Trigger::Submit {
            self.ctl.enqueue_submission(&relval.id)?;
        }
        tracing::debug!(id = %relval.id, owner = %self.owner, "hooks done");
        Ok(())
    }
}
