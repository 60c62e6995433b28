// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic state machine driven by a [`Lifecycle`] transition table.
//!
//! A transition resolves its edge from the table, asks the kind's hooks to
//! validate it, lets them prepare a working copy of the entity, writes the
//! new status, commits, and finally runs the post-commit hooks. A failure at
//! any stage leaves the committed entity as it was.

use crate::error::ControllerError;
use async_trait::async_trait;
use rv_core::{InvalidTransition, Lifecycle, Transition};
use std::marker::PhantomData;
use tracing::Instrument;

/// Who asked for a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// An operator request
    Client,
    /// A queued background task
    Worker,
}

/// Per-kind guards and side effects
#[async_trait]
pub trait TransitionHooks<L: Lifecycle>: Send + Sync {
    /// Preconditions that do not touch the entity.
    async fn validate(
        &self,
        entity: &L::Entity,
        transition: &Transition<L::Status, L::Trigger>,
    ) -> Result<(), ControllerError>;

    /// Mutate the working copy before the status is written.
    async fn before_transition(
        &self,
        entity: &mut L::Entity,
        transition: &Transition<L::Status, L::Trigger>,
    ) -> Result<(), ControllerError>;

    /// Side effects once the new state is committed.
    ///
    /// An error here restores the previous state.
    async fn after_transition(
        &self,
        entity: &L::Entity,
        transition: &Transition<L::Status, L::Trigger>,
    ) -> Result<(), ControllerError>;
}

/// Applies transitions for one kind of entity.
pub struct StateMachine<L> {
    _kind: PhantomData<fn() -> L>,
}

impl<L> Default for StateMachine<L> {
    fn default() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<L> StateMachine<L>
where
    L: Lifecycle,
    L::Entity: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `trigger` on `entity` and commit the result.
    ///
    /// Returns the committed entity. `commit` persists an entity and is
    /// called once on success, and once more with the original if the
    /// post-commit hooks fail.
    #[allow(clippy::too_many_arguments)]
    pub async fn fire<H, F>(
        &self,
        hooks: &H,
        entity: &L::Entity,
        trigger: L::Trigger,
        origin: Origin,
        user: &str,
        time: u64,
        commit: F,
    ) -> Result<L::Entity, ControllerError>
    where
        H: TransitionHooks<L>,
        F: Fn(&L::Entity) -> Result<(), ControllerError> + Send + Sync,
    {
        let from = L::status(entity);
        let span = tracing::info_span!(
            "transition",
            kind = L::KIND,
            id = L::entity_id(entity),
            %trigger,
            %from,
        );
        async {
            if origin == Origin::Client && L::is_internal(trigger) {
                tracing::warn!("internal trigger refused");
                return Err(InvalidTransition {
                    from: from.to_string(),
                    trigger: trigger.to_string(),
                }
                .into());
            }
            let transition = L::resolve(from, trigger)?;

            if let Err(e) = hooks.validate(entity, &transition).await {
                tracing::warn!(error = %e, "transition guard failed");
                return Err(e);
            }

            let mut working = entity.clone();
            hooks.before_transition(&mut working, &transition).await?;
            L::set_status(&mut working, transition.to, user, time);
            commit(&working)?;

            if let Err(e) = hooks.after_transition(&working, &transition).await {
                tracing::error!(error = %e, "post-transition step failed, restoring");
                commit(entity)?;
                return Err(e);
            }

            tracing::info!(to = %transition.to, "transition applied");
            Ok(working)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
