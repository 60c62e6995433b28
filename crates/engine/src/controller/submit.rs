// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission: the request that moves RelVals to `submitting` and the
//! queued task that does the remote work.
//!
//! The task prepares a remote workspace, generates and uploads the configs,
//! submits the job spec, and then moves the RelVal to `submitted`. Any
//! failure reverts it to `approved` and notifies the recipients.

use super::guards::PrefetchFailure;
use super::hooks::HookContext;
use super::{BatchResult, RelvalController};
use crate::error::ControllerError;
use crate::machine::Origin;
use crate::queue::SubmitOutcome;
use crate::scripts::{generate_script, job_spec, upload_script, GENERATE_SCRIPT, UPLOAD_SCRIPT};
use rv_adapters::{DatasetCatalog, JobManager, Notification, NotifyAdapter, RemoteExecutor};
use rv_core::{Clock, LockOwner, Relval, RelvalId, Trigger, Workflow};
use rv_storage::{Query, RelvalStore, SortOrder};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::Instrument;

/// Workflow status requested once the job manager has accepted the job.
const APPROVED_WORKFLOW_STATUS: &str = "assignment-approved";

/// `(label, hash)` from each `DocID <label> <hash>` line of the upload output.
pub(crate) fn parse_config_ids(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            if parts.next()? != "DocID" {
                return None;
            }
            let label = parts.next()?;
            let hash = parts.next().unwrap_or("");
            Some((label.to_string(), hash.to_string()))
        })
        .collect()
}

/// Store each uploaded config id in its step. Every command-driven step
/// needs exactly one id and every id must belong to a step.
pub(crate) fn assign_config_ids(
    relval: &mut Relval,
    hashes: &[(String, String)],
) -> Result<(), String> {
    let mut by_label: HashMap<&str, &str> = hashes
        .iter()
        .map(|(label, hash)| (label.as_str(), hash.as_str()))
        .collect();
    for (index, step) in relval.steps.iter_mut().enumerate() {
        let Some(config) = step.config_file_name(index) else {
            continue;
        };
        match by_label.remove(config.as_str()) {
            None => return Err(format!("Could not find hash for {}", step.name)),
            Some("") => return Err(format!("Missing hash for step {}", step.name)),
            Some(hash) => step.config_id = hash.to_string(),
        }
    }
    if !by_label.is_empty() {
        let mut unused: Vec<&str> = by_label.into_keys().collect();
        unused.sort_unstable();
        return Err(format!("Unused hashes: {}", unused.join(", ")));
    }
    Ok(())
}

fn staging_error(err: std::io::Error) -> ControllerError {
    ControllerError::ExternalService(format!("staging scripts: {}", err))
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
    /// Move approved RelVals to `submitting` and queue their submissions.
    pub(crate) async fn submit_all(&self, relvals: &[Relval], user: &str) -> BatchResult {
        let datasets: Vec<String> = relvals
            .iter()
            .flat_map(Relval::input_datasets)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let access_types = if datasets.is_empty() {
            Ok(HashMap::new())
        } else {
            match self.inner.catalog.list(&datasets).await {
                Ok(records) => Ok(records
                    .into_iter()
                    .map(|d| (d.name, d.access_type))
                    .collect()),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot check input datasets");
                    Err(PrefetchFailure::from(ControllerError::from(e)))
                }
            }
        };

        let mut results = Vec::new();
        for relval in relvals {
            let context = HookContext {
                access_types: Some(access_types.clone()),
                ..HookContext::default()
            };
            let outcome = self.submit_one(&relval.id, user, context).await;
            results.push((relval.id.clone(), outcome));
        }
        results
    }

    async fn submit_one(
        &self,
        id: &RelvalId,
        user: &str,
        context: HookContext,
    ) -> Result<Relval, ControllerError> {
        let owner = LockOwner::generate();
        let _guard = self
            .inner
            .locks
            .try_acquire(id.as_str(), &owner, "submission request")?;
        if self.inner.queue.is_active(id.as_str()) {
            return Err(ControllerError::AlreadyLocked(id.to_string()));
        }
        let relval = self.get(id)?;
        let _campaign = self
            .inner
            .locks
            .acquire(
                &format!("campaign-{}__{}", relval.cmssw_release, relval.batch_name),
                &owner,
                "campaign timestamp",
            )
            .await;
        self.fire_as(
            &relval,
            Trigger::Submit,
            Origin::Client,
            user,
            self.now(),
            &owner,
            context,
        )
        .await
    }

    /// Timestamp shared by submissions of one release and batch.
    ///
    /// Reuses the newest stamp in the same release and batch while it is
    /// inside the campaign window, otherwise starts a new one.
    pub(crate) fn campaign_timestamp(&self, relval: &Relval) -> Result<u64, ControllerError> {
        let query = Query {
            cmssw_release: Some(relval.cmssw_release.clone()),
            batch_name: Some(relval.batch_name.clone()),
            sort: SortOrder::CampaignDesc,
            limit: 1,
            ..Query::default()
        };
        let newest = self
            .inner
            .store
            .query(&query)?
            .items
            .first()
            .map(|r| r.campaign_timestamp)
            .unwrap_or(0);
        let now = self.now();
        let window = self.inner.config.campaign_window.as_secs();
        if newest == 0 || newest < now.saturating_sub(window) {
            tracing::info!(id = %relval.id, campaign_timestamp = now, "new campaign timestamp");
            Ok(now)
        } else {
            tracing::info!(
                id = %relval.id,
                campaign_timestamp = newest,
                "reusing campaign timestamp"
            );
            Ok(newest)
        }
    }

    /// Queue the submission task of `id`. A task already queued for the
    /// same id is kept.
    pub(crate) fn enqueue_submission(&self, id: &RelvalId) -> Result<(), ControllerError> {
        let controller = self.clone();
        let task_id = id.clone();
        let outcome = self.inner.queue.submit(id.as_str(), async move {
            controller.run_submission(&task_id).await;
            Ok(())
        })?;
        match outcome {
            SubmitOutcome::Queued => tracing::info!(id = %id, "submission queued"),
            SubmitOutcome::Duplicate => tracing::info!(id = %id, "submission already queued"),
        }
        Ok(())
    }

    /// Body of the queued submission task.
    pub(crate) async fn run_submission(&self, id: &RelvalId) {
        let owner = LockOwner::for_task(id.as_str());
        async {
            let _guard = self
                .inner
                .locks
                .acquire(id.as_str(), &owner, "submission")
                .await;
            let relval = match self.get(id) {
                Ok(relval) => relval,
                Err(e) => {
                    tracing::error!(error = %e, "cannot load relval for submission");
                    return;
                }
            };
            if !relval.status.is_transient() {
                tracing::warn!(status = %relval.status, "not submitting any more, skipping");
                return;
            }
            match self.submit_remote(&relval).await {
                Ok(submitted) => self.accept(&submitted, &owner).await,
                Err(e) => self.revert(&relval, &owner, &e).await,
            }
        }
        .instrument(tracing::info_span!("relval.submit", id = %id))
        .await
    }

    /// Remote part of a submission; returns the RelVal with config ids and
    /// the new workflow filled in.
    async fn submit_remote(&self, relval: &Relval) -> Result<Relval, ControllerError> {
        let settings = &self.inner.config.remote;
        let staging = tempfile::tempdir().map_err(staging_error)?;
        let generate_path = staging.path().join(GENERATE_SCRIPT);
        let upload_path = staging.path().join(UPLOAD_SCRIPT);
        tokio::fs::write(&generate_path, generate_script(relval))
            .await
            .map_err(staging_error)?;
        tokio::fs::write(
            &upload_path,
            upload_script(relval, &settings.upload_command),
        )
        .await
        .map_err(staging_error)?;

        let session = self
            .inner
            .remote
            .connect(&settings.host, &settings.credentials_file)
            .await?;
        let hashes = self
            .prepare_configs(&session, relval, &generate_path, &upload_path)
            .await;
        self.close_session(&session).await;
        let hashes = hashes?;

        let mut submitted = relval.clone();
        assign_config_ids(&mut submitted, &hashes)
            .map_err(|e| ControllerError::ExternalService(format!("config upload: {}", e)))?;
        let workflow = self.inner.jobs.submit(&job_spec(&submitted)).await?;
        tracing::info!(%workflow, "job submitted");
        submitted.workflows = vec![Workflow::submitted(workflow)];
        submitted.add_history("submission", "succeeded", "automatic", self.now());
        Ok(submitted)
    }

    /// Generate and upload the configs in a fresh remote workspace.
    async fn prepare_configs(
        &self,
        session: &str,
        relval: &Relval,
        generate_path: &Path,
        upload_path: &Path,
    ) -> Result<Vec<(String, String)>, ControllerError> {
        let workspace = format!("{}/{}", self.inner.config.remote.workspace_dir, relval.id);
        self.execute_checked(
            session,
            &[
                format!("rm -rf {}", workspace),
                format!("mkdir -p {}", workspace),
            ],
        )
        .await?;
        let remote = &self.inner.remote;
        remote
            .upload(
                session,
                generate_path,
                &format!("{}/{}", workspace, GENERATE_SCRIPT),
            )
            .await?;
        remote
            .upload(
                session,
                upload_path,
                &format!("{}/{}", workspace, UPLOAD_SCRIPT),
            )
            .await?;

        tracing::info!(%workspace, "generating configs");
        self.execute_checked(session, &run_script(&workspace, GENERATE_SCRIPT))
            .await?;
        tracing::info!("uploading configs");
        let stdout = self
            .execute_checked(session, &run_script(&workspace, UPLOAD_SCRIPT))
            .await?;
        let hashes = parse_config_ids(&stdout);

        if let Err(e) = self
            .execute_checked(session, &[format!("rm -rf {}", workspace)])
            .await
        {
            tracing::warn!(error = %e, "cannot clean remote workspace");
        }
        Ok(hashes)
    }

    /// Record acceptance, approve the workflow and refresh it.
    async fn accept(&self, submitted: &Relval, owner: &LockOwner) {
        let accepted = match self
            .fire_as(
                submitted,
                Trigger::Accept,
                Origin::Worker,
                "automatic",
                self.now(),
                owner,
                HookContext::default(),
            )
            .await
        {
            Ok(accepted) => accepted,
            Err(e) => {
                self.revert(submitted, owner, &e).await;
                return;
            }
        };
        let workflow = accepted
            .workflows
            .first()
            .map(|w| w.name.clone())
            .unwrap_or_default();

        let delay = self.inner.config.approve_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Err(e) = self
            .inner
            .jobs
            .set_status(&workflow, APPROVED_WORKFLOW_STATUS)
            .await
        {
            tracing::warn!(%workflow, error = %e, "cannot approve workflow");
        }

        let id = &accepted.id;
        let body = format!(
            "Hello,\n\nSubmission of {} succeeded.\nWorkflow: {}\n{}\n",
            id,
            workflow,
            self.link(id)
        );
        let subject = format!("[Success] RelVal {} submission", id);
        self.notify(Notification::new(subject, body)).await;

        if let Err(e) = self.refresh_as(id, owner).await {
            tracing::warn!(error = %e, "cannot refresh workflows after submission");
        }
    }

    /// Put a failed submission back to `approved` and report it.
    async fn revert(&self, relval: &Relval, owner: &LockOwner, error: &ControllerError) {
        tracing::error!(error = %error, "submission failed");
        let context = HookContext {
            revert: Some("failed"),
            ..HookContext::default()
        };
        if let Err(e) = self
            .fire_as(
                relval,
                Trigger::Rollback,
                Origin::Worker,
                "automatic",
                self.now(),
                owner,
                context,
            )
            .await
        {
            tracing::error!(error = %e, "cannot revert failed submission");
        }

        let id = &relval.id;
        let body = format!(
            "Hello,\n\nUnfortunately submission of {} failed.\n{}\nError message:\n\n{}\n",
            id,
            self.link(id),
            error
        );
        let notification = Notification::new(format!("RelVal {} submission failed", id), body)
            .with_attachment(
                format!("{}_{}", id, GENERATE_SCRIPT),
                generate_script(relval),
            );
        self.notify(notification).await;
    }
}

fn run_script(workspace: &str, script: &str) -> Vec<String> {
    vec![
        format!("cd {}", workspace),
        format!("chmod +x {}", script),
        format!("./{}", script),
    ]
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
