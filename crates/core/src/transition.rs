// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative transition tables.
//!
//! Each entity kind supplies one static table of `(from, trigger, to)` rows.
//! Every `(status, trigger)` pair absent from the table is an invalid
//! transition; nothing outside the table may change an entity's status.

use crate::relval::Relval;
use crate::status::RelvalStatus::{Approved, Archived, Done, New, Submitted, Submitting};
use crate::status::{RelvalStatus, Trigger};
use std::fmt;
use thiserror::Error;

/// One edge of a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<S, T> {
    pub from: S,
    pub trigger: T,
    pub to: S,
}

/// Requested trigger is not defined for the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {trigger} from status {from}")]
pub struct InvalidTransition {
    pub from: String,
    pub trigger: String,
}

/// A kind of entity driven by a transition table.
pub trait Lifecycle: Send + Sync + 'static {
    type Status: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Trigger: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Entity: Send + Sync;

    /// Kind name, for logs.
    const KIND: &'static str;

    fn table() -> &'static [Transition<Self::Status, Self::Trigger>];

    fn entity_id(entity: &Self::Entity) -> &str;

    fn status(entity: &Self::Entity) -> Self::Status;

    /// Triggers reserved for background work; clients may not fire them.
    fn is_internal(_trigger: Self::Trigger) -> bool {
        false
    }

    /// Write the new status and record it in the entity's audit log.
    fn set_status(entity: &mut Self::Entity, status: Self::Status, user: &str, time: u64);

    /// Look up the edge for `trigger` from `from`.
    fn resolve(
        from: Self::Status,
        trigger: Self::Trigger,
    ) -> Result<Transition<Self::Status, Self::Trigger>, InvalidTransition> {
        Self::table()
            .iter()
            .find(|t| t.from == from && t.trigger == trigger)
            .copied()
            .ok_or_else(|| InvalidTransition {
                from: from.to_string(),
                trigger: trigger.to_string(),
            })
    }

    /// Triggers defined for `from`, in table order.
    fn triggers_from(from: Self::Status) -> Vec<Self::Trigger> {
        Self::table()
            .iter()
            .filter(|t| t.from == from)
            .map(|t| t.trigger)
            .collect()
    }
}

/// Lifecycle of a [`Relval`].
pub struct RelvalLifecycle;

const fn edge(
    from: RelvalStatus,
    trigger: Trigger,
    to: RelvalStatus,
) -> Transition<RelvalStatus, Trigger> {
    Transition { from, trigger, to }
}

const RELVAL_TRANSITIONS: &[Transition<RelvalStatus, Trigger>] = &[
    edge(New, Trigger::Approve, Approved),
    // Resets are idempotent: repeating one re-clears resolved values.
    edge(New, Trigger::Reset, New),
    edge(Approved, Trigger::Submit, Submitting),
    edge(Approved, Trigger::Reset, New),
    edge(Approved, Trigger::Rollback, Approved),
    edge(Submitting, Trigger::Accept, Submitted),
    edge(Submitting, Trigger::Rollback, Approved),
    edge(Submitted, Trigger::Complete, Done),
    edge(Submitted, Trigger::Archive, Archived),
    edge(Submitted, Trigger::Rollback, Approved),
    edge(Done, Trigger::Rollback, Approved),
    edge(Archived, Trigger::Complete, Done),
    edge(Archived, Trigger::Rollback, Approved),
];

impl Lifecycle for RelvalLifecycle {
    type Status = RelvalStatus;
    type Trigger = Trigger;
    type Entity = Relval;

    const KIND: &'static str = "relval";

    fn table() -> &'static [Transition<RelvalStatus, Trigger>] {
        RELVAL_TRANSITIONS
    }

    fn entity_id(entity: &Relval) -> &str {
        entity.id.as_str()
    }

    fn status(entity: &Relval) -> RelvalStatus {
        entity.status
    }

    fn is_internal(trigger: Trigger) -> bool {
        trigger.is_internal()
    }

    fn set_status(entity: &mut Relval, status: RelvalStatus, user: &str, time: u64) {
        entity.status = status;
        entity.add_history("status", status.as_str(), user, time);
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
