// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use accrue_adapters::{ConsoleStatusSink, HttpRemoteAdapter, TracedRemoteAdapter};
use accrue_core::{Config, FileIdentitySource, SystemClock};
use accrue_engine::{
    Coordinator, CoordinatorConfig, CoordinatorError, ShutdownSummary, StartOutcome, WorkerDeps,
};
use accrue_storage::{SessionStore, StorageError};
use thiserror::Error;
use tracing::info;

/// Coordinator with concrete adapter types (remote calls wrapped with tracing)
pub type DaemonCoordinator =
    Coordinator<TracedRemoteAdapter<HttpRemoteAdapter>, ConsoleStatusSink, SystemClock>;

/// Errors that can occur during daemon lifecycle
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine log directory")]
    NoLogDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// Daemon state during operation
pub struct DaemonState {
    coordinator: DaemonCoordinator,
    /// Number of workers started
    pub wallets: usize,
}

impl DaemonState {
    /// Settle every worker; a second call while one is running fails
    pub async fn shutdown(&self) -> Result<ShutdownSummary, LifecycleError> {
        info!("Shutting down workers...");
        Ok(self.coordinator.shutdown().await?)
    }
}

/// Build the adapters and start one worker per wallet
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    let store = SessionStore::open(config.paths.sessions.clone())?;
    let deps = WorkerDeps {
        remote: TracedRemoteAdapter::new(HttpRemoteAdapter::new(&config.api)),
        status: ConsoleStatusSink::new(),
        store,
        clock: SystemClock,
    };

    let mut coordinator = Coordinator::new(deps, CoordinatorConfig::from_config(config));
    let source = FileIdentitySource::new(config.paths.wallets.clone());
    let wallets = match coordinator.start(&source).await? {
        StartOutcome::Started { workers } => workers,
        StartOutcome::AlreadyRunning => coordinator.workers().len(),
    };

    info!(
        wallets,
        base_url = %config.api.base_url,
        sessions = %config.paths.sessions.display(),
        "workers started"
    );
    Ok(DaemonState {
        coordinator,
        wallets,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
