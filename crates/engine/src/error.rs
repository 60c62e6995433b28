// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the RelVal controller

use crate::lock::AlreadyLocked;
use crate::queue::QueueError;
use rv_adapters::{CatalogError, JobManagerError, RemoteError};
use rv_core::{InvalidTransition, RelvalId};
use rv_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by controller operations
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0} is locked: operation already in progress")]
    AlreadyLocked(String),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// One human-readable item per failing step or field
    #[error("{}", .0.join("; "))]
    GuardFailed(Vec<String>),
    #[error("remote command exited with code {exit_code}: {stderr}")]
    RemoteExecutionFailed { exit_code: i32, stderr: String },
    #[error("external service error: {0}")]
    ExternalService(String),
    #[error("{0} not found")]
    NotFound(RelvalId),
    #[error("{0} already exists")]
    AlreadyExists(RelvalId),
    #[error("cannot delete {id}: {reason}")]
    DeleteRefused { id: RelvalId, reason: String },
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ControllerError {
    pub fn guard(reason: impl Into<String>) -> Self {
        ControllerError::GuardFailed(vec![reason.into()])
    }
}

impl From<AlreadyLocked> for ControllerError {
    fn from(err: AlreadyLocked) -> Self {
        ControllerError::AlreadyLocked(err.key)
    }
}

impl From<RemoteError> for ControllerError {
    fn from(err: RemoteError) -> Self {
        ControllerError::ExternalService(format!("remote host: {}", err))
    }
}

impl From<JobManagerError> for ControllerError {
    fn from(err: JobManagerError) -> Self {
        ControllerError::ExternalService(format!("job manager: {}", err))
    }
}

impl From<CatalogError> for ControllerError {
    fn from(err: CatalogError) -> Self {
        ControllerError::ExternalService(format!("dataset catalog: {}", err))
    }
}
