// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RelVal status and the triggers that move between statuses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a RelVal. Exactly one at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelvalStatus {
    New,
    Approved,
    /// Queued or in-flight submission. Never entered directly by a client.
    Submitting,
    Submitted,
    Done,
    Archived,
}

impl RelvalStatus {
    pub const ALL: [RelvalStatus; 6] = [
        RelvalStatus::New,
        RelvalStatus::Approved,
        RelvalStatus::Submitting,
        RelvalStatus::Submitted,
        RelvalStatus::Done,
        RelvalStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelvalStatus::New => "new",
            RelvalStatus::Approved => "approved",
            RelvalStatus::Submitting => "submitting",
            RelvalStatus::Submitted => "submitted",
            RelvalStatus::Done => "done",
            RelvalStatus::Archived => "archived",
        }
    }

    /// Whether this status only exists while background work is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelvalStatus::Submitting)
    }
}

impl fmt::Display for RelvalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RelvalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelvalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Event that requests a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Resolve conditions and check inputs: `new -> approved`
    Approve,
    /// Stamp the campaign and enqueue submission: `approved -> submitting`
    Submit,
    /// Worker-only: the job manager accepted the submission
    Accept,
    /// Workflow completed and all outputs are valid
    Complete,
    /// Workflow archived too long without valid outputs
    Archive,
    /// Operator rollback to `approved`
    Rollback,
    /// Operator rollback to `new`
    Reset,
}

impl Trigger {
    pub const ALL: [Trigger; 7] = [
        Trigger::Approve,
        Trigger::Submit,
        Trigger::Accept,
        Trigger::Complete,
        Trigger::Archive,
        Trigger::Rollback,
        Trigger::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Approve => "approve",
            Trigger::Submit => "submit",
            Trigger::Accept => "accept",
            Trigger::Complete => "complete",
            Trigger::Archive => "archive",
            Trigger::Rollback => "rollback",
            Trigger::Reset => "reset",
        }
    }

    /// Triggers that only the submission worker may fire.
    pub fn is_internal(&self) -> bool {
        matches!(self, Trigger::Accept)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
