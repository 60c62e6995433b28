// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RelVal controller: every lifecycle operation on a RelVal.
//!
//! Client-facing operations take the entity lock with `try_acquire`, so a
//! concurrent request on the same id fails fast with `AlreadyLocked`. The
//! submission task takes the same lock blocking, as its own owner.

mod guards;
mod hooks;
mod submit;
mod workflows;

use crate::config::EngineConfig;
use crate::error::ControllerError;
use crate::lock::{LockRegistry, LockStatus};
use crate::machine::{Origin, StateMachine};
use crate::queue::{TaskQueue, WorkerStatus};
use guards::{parse_resolved, wanted_conditions, PrefetchFailure, ResolvedConditions};
use hooks::{HookContext, RelvalHooks};
use rv_adapters::{DatasetCatalog, JobManager, Notification, NotifyAdapter, RemoteExecutor};
use rv_core::{
    prepid_namespace, Clock, InvalidTransition, Lifecycle, LockOwner, Relval, RelvalId,
    RelvalLifecycle, RelvalStatus, Trigger,
};
use rv_storage::{Page, Query, RelvalStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Outcome of one id in a batch operation.
pub type BatchResult = Vec<(RelvalId, Result<Relval, ControllerError>)>;

/// External collaborators of the controller
pub struct ControllerDeps<S, R, J, D, N> {
    pub store: S,
    pub remote: R,
    pub jobs: J,
    pub catalog: D,
    pub notifier: N,
}

pub(crate) struct Inner<S, R, J, D, N, C> {
    pub(crate) store: S,
    pub(crate) remote: R,
    pub(crate) jobs: J,
    pub(crate) catalog: D,
    pub(crate) notifier: N,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) locks: LockRegistry,
    pub(crate) queue: TaskQueue,
    machine: StateMachine<RelvalLifecycle>,
}

/// Drives RelVals through their lifecycle.
///
/// Clones share the lock registry, the task queue and the adapters.
pub struct RelvalController<S, R, J, D, N, C> {
    pub(crate) inner: Arc<Inner<S, R, J, D, N, C>>,
}

impl<S, R, J, D, N, C> Clone for RelvalController<S, R, J, D, N, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
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
    /// Build a controller and start its submission workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(deps: ControllerDeps<S, R, J, D, N>, clock: C, config: EngineConfig) -> Self {
        let queue = TaskQueue::start(config.workers, config.queue_capacity);
        let locks = LockRegistry::new(config.lock_prune_threshold);
        Self {
            inner: Arc::new(Inner {
                store: deps.store,
                remote: deps.remote,
                jobs: deps.jobs,
                catalog: deps.catalog,
                notifier: deps.notifier,
                clock,
                config,
                locks,
                queue,
                machine: StateMachine::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(crate) fn now(&self) -> u64 {
        self.inner.clock.epoch_secs()
    }

    /// Fetch a live RelVal.
    pub fn get(&self, id: &RelvalId) -> Result<Relval, ControllerError> {
        self.inner
            .store
            .get(id)?
            .ok_or_else(|| ControllerError::NotFound(id.clone()))
    }

    pub fn query(&self, query: &Query) -> Result<Page, ControllerError> {
        Ok(self.inner.store.query(query)?)
    }

    /// Store a new RelVal in status `new`.
    ///
    /// An empty `draft.id` is minted as the next serial of the draft's
    /// namespace. An explicit id must never have been issued before.
    pub async fn create(&self, draft: Relval, user: &str) -> Result<Relval, ControllerError> {
        if draft.cmssw_release.trim().is_empty() {
            return Err(ControllerError::InvalidUpdate(
                "cmssw_release is required".to_string(),
            ));
        }
        let namespace = if draft.id.as_str().is_empty() {
            prepid_namespace(
                &draft.cmssw_release,
                &draft.batch_name,
                &draft.workflow_name,
            )
        } else {
            draft
                .id
                .namespace()
                .map(str::to_string)
                .ok_or_else(|| {
                    ControllerError::InvalidUpdate(format!("malformed id {}", draft.id))
                })?
        };

        let owner = LockOwner::generate();
        let _guard = self
            .inner
            .locks
            .acquire(
                &format!("generate-prepid-{}", namespace),
                &owner,
                "prepid generation",
            )
            .await;

        let max_serial = self.inner.store.max_serial(&namespace)?;
        let id = if draft.id.as_str().is_empty() {
            let serial = max_serial.checked_add(1).ok_or_else(|| {
                ControllerError::InvalidUpdate(format!("no serials left in {}", namespace))
            })?;
            RelvalId::compose(&namespace, serial)
        } else {
            let taken = draft.id.serial().is_some_and(|serial| serial <= max_serial);
            if taken || self.inner.store.get(&draft.id)?.is_some() {
                return Err(ControllerError::AlreadyExists(draft.id));
            }
            draft.id.clone()
        };

        let mut relval = Relval {
            id,
            status: RelvalStatus::New,
            workflows: Vec::new(),
            output_datasets: Vec::new(),
            history: Vec::new(),
            campaign_timestamp: 0,
            deleted: false,
            ..draft
        };
        relval.clear_resolved_conditions();
        relval.clear_config_ids();
        relval.add_history("created", "", user, self.now());
        self.inner.store.save(&relval)?;
        tracing::info!(id = %relval.id, user, "relval created");
        Ok(relval)
    }

    /// Apply the editable fields of `changed` to the stored RelVal.
    pub fn update(&self, changed: &Relval, user: &str) -> Result<Relval, ControllerError> {
        let owner = LockOwner::generate();
        let _guard = self
            .inner
            .locks
            .try_acquire(changed.id.as_str(), &owner, "update")?;
        let mut relval = self.get(&changed.id)?;

        let immutable = [
            ("status", relval.status != changed.status),
            ("workflows", relval.workflows != changed.workflows),
            ("output_datasets", relval.output_datasets != changed.output_datasets),
            ("history", relval.history != changed.history),
            (
                "campaign_timestamp",
                relval.campaign_timestamp != changed.campaign_timestamp,
            ),
            ("deleted", relval.deleted != changed.deleted),
        ];
        if let Some((field, _)) = immutable.iter().find(|(_, differs)| *differs) {
            return Err(ControllerError::InvalidUpdate(format!(
                "{} cannot be changed",
                field
            )));
        }

        let new_only = [
            ("cmssw_release", relval.cmssw_release != changed.cmssw_release),
            ("batch_name", relval.batch_name != changed.batch_name),
            ("workflow_name", relval.workflow_name != changed.workflow_name),
            ("steps", relval.steps != changed.steps),
            ("label", relval.label != changed.label),
            ("cpu_cores", relval.cpu_cores != changed.cpu_cores),
            ("memory_mb", relval.memory_mb != changed.memory_mb),
            ("scram_arch", relval.scram_arch != changed.scram_arch),
        ];
        let mut fields: Vec<&str> = Vec::new();
        for (field, differs) in new_only {
            if !differs {
                continue;
            }
            if relval.status != RelvalStatus::New {
                return Err(ControllerError::InvalidUpdate(format!(
                    "{} can only be changed in status new",
                    field
                )));
            }
            fields.push(field);
        }
        if relval.notes != changed.notes {
            fields.push("notes");
        }
        if relval.jira_ticket != changed.jira_ticket {
            fields.push("jira_ticket");
        }
        if fields.is_empty() {
            return Ok(relval);
        }

        relval.cmssw_release = changed.cmssw_release.clone();
        relval.batch_name = changed.batch_name.clone();
        relval.workflow_name = changed.workflow_name.clone();
        relval.steps = changed.steps.clone();
        relval.label = changed.label.clone();
        relval.cpu_cores = changed.cpu_cores;
        relval.memory_mb = changed.memory_mb;
        relval.scram_arch = changed.scram_arch.clone();
        relval.notes = changed.notes.clone();
        relval.jira_ticket = changed.jira_ticket.clone();
        relval.add_history("update", fields.join(", "), user, self.now());
        self.inner.store.save(&relval)?;
        tracing::info!(id = %relval.id, user, fields = %fields.join(","), "relval updated");
        Ok(relval)
    }

    /// Tombstone a RelVal that has no remote state.
    pub fn delete(&self, id: &RelvalId, user: &str) -> Result<(), ControllerError> {
        let owner = LockOwner::generate();
        let _guard = self.inner.locks.try_acquire(id.as_str(), &owner, "delete")?;
        let relval = self.get(id)?;
        if relval.status != RelvalStatus::New {
            return Err(ControllerError::DeleteRefused {
                id: id.clone(),
                reason: format!("status is {}", relval.status),
            });
        }
        if !relval.workflows.is_empty() {
            return Err(ControllerError::DeleteRefused {
                id: id.clone(),
                reason: format!("{} workflows exist", relval.workflows.len()),
            });
        }
        self.inner.store.delete(id)?;
        tracing::info!(id = %id, user, "relval deleted");
        Ok(())
    }

    /// Move each RelVal one step forward.
    ///
    /// Ids are grouped by current status and each group is handled with
    /// one batch-wide lookup. A failure is reported per id and never stops
    /// the others. Results come back in input order, duplicates removed.
    pub async fn next_status(&self, ids: &[RelvalId], user: &str) -> BatchResult {
        let ids = unique(ids);
        let mut results: HashMap<RelvalId, Result<Relval, ControllerError>> = HashMap::new();
        let mut groups: BTreeMap<RelvalStatus, Vec<Relval>> = BTreeMap::new();
        for id in &ids {
            match self.get(id) {
                Ok(relval) => groups.entry(relval.status).or_default().push(relval),
                Err(e) => {
                    results.insert(id.clone(), Err(e));
                }
            }
        }

        for (status, relvals) in groups {
            tracing::debug!(%status, count = relvals.len(), "moving group forward");
            let outcomes = match forward_trigger(status) {
                Some(Trigger::Approve) => self.approve_all(&relvals, user).await,
                Some(Trigger::Submit) => self.submit_all(&relvals, user).await,
                Some(Trigger::Complete) => self.finish_all(&relvals, user).await,
                _ => relvals
                    .iter()
                    .map(|relval| (relval.id.clone(), Err(self.no_next_status(relval))))
                    .collect(),
            };
            results.extend(outcomes);
        }

        collect_in_order(ids, results)
    }

    /// Move each RelVal one step back: `approved`/`new` to `new`, anything
    /// later to `approved`.
    pub async fn previous_status(&self, ids: &[RelvalId], user: &str) -> BatchResult {
        let mut results = Vec::new();
        for id in unique(ids) {
            let outcome = match self.get(&id) {
                Ok(relval) => {
                    let trigger = match relval.status {
                        RelvalStatus::New | RelvalStatus::Approved => Trigger::Reset,
                        _ => Trigger::Rollback,
                    };
                    self.fire_locked(&id, trigger, user).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                tracing::warn!(id = %id, error = %e, "cannot move to previous status");
            }
            results.push((id, outcome));
        }
        results
    }

    /// Back to `approved`, stopping remote workflows first.
    pub async fn rollback(&self, id: &RelvalId, user: &str) -> Result<Relval, ControllerError> {
        self.fire_locked(id, Trigger::Rollback, user).await
    }

    /// Back to `new`, dropping resolved conditions.
    pub async fn reset(&self, id: &RelvalId, user: &str) -> Result<Relval, ControllerError> {
        self.fire_locked(id, Trigger::Reset, user).await
    }

    /// Roll back every `submitting` RelVal that has no submission task.
    ///
    /// Returns the ids moved back to `approved`.
    pub async fn recover_stuck(&self) -> Result<Vec<RelvalId>, ControllerError> {
        let stuck = self
            .inner
            .store
            .query(&Query::with_status(RelvalStatus::Submitting))?
            .items;
        let mut recovered = Vec::new();
        for relval in stuck {
            let id = relval.id;
            if self.inner.queue.is_active(id.as_str()) {
                continue;
            }
            let owner = LockOwner::generate();
            let Ok(_guard) = self.inner.locks.try_acquire(id.as_str(), &owner, "recovery") else {
                continue;
            };
            let relval = self.get(&id)?;
            if !relval.status.is_transient() {
                continue;
            }
            let context = HookContext {
                revert: Some("interrupted"),
                ..HookContext::default()
            };
            match self
                .fire_as(
                    &relval,
                    Trigger::Rollback,
                    Origin::Worker,
                    "automatic",
                    self.now(),
                    &owner,
                    context,
                )
                .await
            {
                Ok(_) => {
                    tracing::warn!(id = %id, "interrupted submission rolled back");
                    recovered.push(id);
                }
                Err(e) => tracing::error!(id = %id, error = %e, "cannot recover submission"),
            }
        }
        Ok(recovered)
    }

    pub fn lock_status(&self) -> BTreeMap<String, LockStatus> {
        self.inner.locks.status()
    }

    pub fn queued_names(&self) -> Vec<String> {
        self.inner.queue.queued_names()
    }

    pub fn worker_status(&self) -> Vec<WorkerStatus> {
        self.inner.queue.worker_status()
    }

    /// Stop accepting submissions and wait for queued ones to finish.
    pub async fn shutdown(&self) {
        self.inner.queue.shutdown().await;
    }

    fn no_next_status(&self, relval: &Relval) -> ControllerError {
        let id = relval.id.as_str();
        if self.inner.queue.is_active(id) || self.inner.locks.is_locked(id) {
            return ControllerError::AlreadyLocked(id.to_string());
        }
        InvalidTransition {
            from: relval.status.to_string(),
            trigger: "next".to_string(),
        }
        .into()
    }

    async fn approve_all(&self, relvals: &[Relval], user: &str) -> BatchResult {
        let conditions = self.resolve_conditions(relvals).await;
        let mut results = Vec::new();
        for relval in relvals {
            let context = HookContext {
                conditions: Some(conditions.clone()),
                ..HookContext::default()
            };
            let outcome = self
                .fire_locked_with(&relval.id, Trigger::Approve, user, context)
                .await;
            results.push((relval.id.clone(), outcome));
        }
        results
    }

    async fn finish_all(&self, relvals: &[Relval], user: &str) -> BatchResult {
        let mut results = Vec::new();
        for relval in relvals {
            let outcome = self.finish(&relval.id, user).await;
            results.push((relval.id.clone(), outcome));
        }
        results
    }

    async fn finish(&self, id: &RelvalId, user: &str) -> Result<Relval, ControllerError> {
        let owner = LockOwner::generate();
        let _guard = self
            .inner
            .locks
            .try_acquire(id.as_str(), &owner, "status check")?;
        let mut relval = self.get(id)?;
        self.refresh_into(&mut relval).await?;
        self.inner.store.save(&relval)?;

        let cutoff = self
            .now()
            .saturating_sub(self.inner.config.archive_threshold.as_secs());
        let (trigger, time) = match workflows::finish_decision(&relval, cutoff) {
            Ok(workflows::Finish::Complete(time)) => (Trigger::Complete, time),
            Ok(workflows::Finish::Archive(time)) => (Trigger::Archive, time),
            Err(reasons) => return Err(ControllerError::GuardFailed(reasons)),
        };
        self.fire_as(
            &relval,
            trigger,
            Origin::Client,
            user,
            time,
            &owner,
            HookContext::default(),
        )
        .await
    }

    /// Resolve the auto conditions of `relvals`, one remote command per
    /// environment.
    async fn resolve_conditions(&self, relvals: &[Relval]) -> ResolvedConditions {
        let wanted = wanted_conditions(relvals);
        let mut resolved = ResolvedConditions::default();
        if wanted.is_empty() {
            return resolved;
        }

        let settings = &self.inner.config.remote;
        let session = match self
            .inner
            .remote
            .connect(&settings.host, &settings.credentials_file)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                let failure = PrefetchFailure::from(ControllerError::from(e));
                for (release, arch) in wanted.keys() {
                    resolved.fail(release, arch, failure.clone());
                }
                return resolved;
            }
        };

        for ((release, arch), keys) in &wanted {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let command = format!(
                "{} \"{}\" \"{}\" \"{}\" || exit $?",
                settings.conditions_command,
                release,
                arch,
                keys.join(",")
            );
            match self.execute_checked(&session, &[command]).await {
                Ok(stdout) => {
                    for (key, value) in parse_resolved(&stdout) {
                        resolved.insert(release, arch, &key, &value);
                    }
                }
                Err(e) => {
                    tracing::warn!(%release, %arch, error = %e, "cannot resolve conditions");
                    resolved.fail(release, arch, e.into());
                }
            }
        }
        self.close_session(&session).await;
        resolved
    }

    async fn fire_locked(
        &self,
        id: &RelvalId,
        trigger: Trigger,
        user: &str,
    ) -> Result<Relval, ControllerError> {
        self.fire_locked_with(id, trigger, user, HookContext::default())
            .await
    }

    /// Fire `trigger` on the current document of `id` under its lock.
    async fn fire_locked_with(
        &self,
        id: &RelvalId,
        trigger: Trigger,
        user: &str,
        context: HookContext,
    ) -> Result<Relval, ControllerError> {
        let owner = LockOwner::generate();
        let _guard = self
            .inner
            .locks
            .try_acquire(id.as_str(), &owner, &format!("{} request", trigger))?;
        let relval = self.get(id)?;
        self.fire_as(
            &relval,
            trigger,
            Origin::Client,
            user,
            self.now(),
            &owner,
            context,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn fire_as(
        &self,
        relval: &Relval,
        trigger: Trigger,
        origin: Origin,
        user: &str,
        time: u64,
        owner: &LockOwner,
        context: HookContext,
    ) -> Result<Relval, ControllerError> {
        let hooks = RelvalHooks::new(self, owner, context);
        let store = &self.inner.store;
        self.inner
            .machine
            .fire(&hooks, relval, trigger, origin, user, time, |relval| {
                store.save(relval).map_err(ControllerError::from)
            })
            .await
    }

    /// Run `commands` in `session`; a non-zero exit is an error.
    pub(crate) async fn execute_checked(
        &self,
        session: &str,
        commands: &[String],
    ) -> Result<String, ControllerError> {
        let output = self.inner.remote.execute(session, commands).await?;
        if output.exit_code != 0 {
            return Err(ControllerError::RemoteExecutionFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    pub(crate) async fn close_session(&self, session: &str) {
        if let Err(e) = self.inner.remote.close(session).await {
            tracing::warn!(session, error = %e, "cannot close remote session");
        }
    }

    /// Send `notification` to the configured recipients; failures are logged.
    pub(crate) async fn notify(&self, notification: Notification) {
        let notification = notification.with_recipients(self.inner.config.recipients.clone());
        if let Err(e) = self.inner.notifier.notify(&notification).await {
            tracing::warn!(subject = %notification.subject, error = %e, "notification failed");
        }
    }

    /// Link to `id` in the service UI, empty when no URL is configured.
    pub(crate) fn link(&self, id: &RelvalId) -> String {
        let base = self.inner.config.service_url.trim_end_matches('/');
        if base.is_empty() {
            String::new()
        } else {
            format!("{}/relvals?prepid={}", base, id)
        }
    }
}

/// The step `next` takes from `status`: the first client trigger in the
/// table that moves forward.
fn forward_trigger(status: RelvalStatus) -> Option<Trigger> {
    RelvalLifecycle::triggers_from(status).into_iter().find(|trigger| {
        !RelvalLifecycle::is_internal(*trigger)
            && !matches!(trigger, Trigger::Reset | Trigger::Rollback)
    })
}

fn unique(ids: &[RelvalId]) -> Vec<RelvalId> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

fn collect_in_order(
    ids: Vec<RelvalId>,
    mut results: HashMap<RelvalId, Result<Relval, ControllerError>>,
) -> BatchResult {
    ids.into_iter()
        .map(|id| {
            let outcome = results
                .remove(&id)
                .unwrap_or_else(|| Err(ControllerError::NotFound(id.clone())));
            (id, outcome)
        })
        .collect()
}

#[cfg(test)]
#[path = "../controller_tests/mod.rs"]
mod tests;
