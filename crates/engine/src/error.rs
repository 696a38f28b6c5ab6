// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for workers and the coordinator

use accrue_adapters::RemoteError;
use accrue_core::{IdentityError, RetryError};
use thiserror::Error;

/// Errors from a single worker's operations
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("wallet not registered")]
    NotRegistered,
    #[error(transparent)]
    Remote(#[from] RetryError<RemoteError>),
    #[error("worker has not been initialized")]
    NotInitialized,
    #[error("worker was stopped")]
    Stopped,
}

impl WorkerError {
    /// True when the remote side refused the request outright (400/401)
    pub fn is_rejection(&self) -> bool {
        matches!(self, WorkerError::Remote(e) if e.is_fatal())
    }
}

/// Errors from the coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("No valid wallets found")]
    NoIdentities,
    #[error(transparent)]
    Identities(#[from] IdentityError),
    #[error("shutdown already in progress")]
    AlreadyShuttingDown,
}
