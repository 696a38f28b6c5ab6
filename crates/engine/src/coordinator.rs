// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator: loads identities, runs one worker per identity, and drives
//! the graceful shutdown that settles every worker exactly once.

use crate::error::CoordinatorError;
use crate::worker::{Worker, WorkerConfig, WorkerDeps};
use accrue_adapters::{RemoteAdapter, StatusSink};
use accrue_core::status::UNIT;
use accrue_core::{Clock, Config, IdentitySource};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub worker: WorkerConfig,
    /// Upper bound on settling all workers at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CoordinatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker: WorkerConfig::from_config(config),
            shutdown_timeout: config.timing.shutdown_timeout,
        }
    }
}

/// Result of `Coordinator::start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Workers were already running; nothing changed
    AlreadyRunning,
    Started { workers: usize },
}

/// Aggregate result of a graceful shutdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShutdownSummary {
    /// Workers that were running
    pub wallets: usize,
    /// Workers whose settlement finished before the deadline
    pub settled: usize,
    /// Sum of every settled worker's cumulative paid amount
    pub total_paid: f64,
}

impl fmt::Display for ShutdownSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Final Summary ===")?;
        writeln!(f, "Total Wallets: {}", self.wallets)?;
        write!(f, "Total Paid: {:.8} {}", self.total_paid, UNIT)
    }
}

/// Owns the set of workers
pub struct Coordinator<R, S, C> {
    deps: WorkerDeps<R, S, C>,
    config: CoordinatorConfig,
    workers: Vec<Arc<Worker<R, S, C>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    running: bool,
    shutting_down: AtomicBool,
}

impl<R, S, C> Coordinator<R, S, C>
where
    R: RemoteAdapter,
    S: StatusSink,
    C: Clock,
{
    pub fn new(deps: WorkerDeps<R, S, C>, config: CoordinatorConfig) -> Self {
        Self {
            deps,
            config,
            workers: Vec::new(),
            tasks: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
            running: false,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn workers(&self) -> &[Arc<Worker<R, S, C>>] {
        &self.workers
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Load identities and spawn one worker per identity, numbered from 1.
    ///
    /// The coordinator only counts as running once workers exist, so a
    /// failed start can be retried.
    pub async fn start(
        &mut self,
        source: &impl IdentitySource,
    ) -> Result<StartOutcome, CoordinatorError> {
        if self.running {
            warn!("coordinator is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if self.is_shutting_down() {
            return Err(CoordinatorError::AlreadyShuttingDown);
        }

        let identities = source.load()?;
        if identities.is_empty() {
            return Err(CoordinatorError::NoIdentities);
        }
        info!(wallets = identities.len(), "loaded wallets");

        let mut tasks = Vec::with_capacity(identities.len());
        for (index, identity) in identities.into_iter().enumerate() {
            let worker = Arc::new(Worker::new(
                identity,
                index + 1,
                self.deps.clone(),
                self.config.worker.clone(),
                self.cancel.child_token(),
            ));
            tasks.push(Arc::clone(&worker).spawn());
            self.workers.push(worker);
        }
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(tasks);
        self.running = true;

        Ok(StartOutcome::Started {
            workers: self.workers.len(),
        })
    }

    /// Stop every worker concurrently and total what they paid.
    ///
    /// Settlement is bounded by the configured shutdown timeout; workers
    /// still settling at the deadline are abandoned and left out of the
    /// total. Only the first call proceeds.
    pub async fn shutdown(&self) -> Result<ShutdownSummary, CoordinatorError> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            warn!("shutdown already in progress");
            return Err(CoordinatorError::AlreadyShuttingDown);
        }

        info!(wallets = self.workers.len(), "shutting down workers");
        self.cancel.cancel();
        let deadline = Instant::now() + self.config.shutdown_timeout;

        let mut stops = JoinSet::new();
        for worker in &self.workers {
            let worker = Arc::clone(worker);
            stops.spawn(async move { (worker.ordinal(), worker.stop().await) });
        }

        let mut summary = ShutdownSummary {
            wallets: self.workers.len(),
            settled: 0,
            total_paid: 0.0,
        };
        loop {
            match tokio::time::timeout_at(deadline, stops.join_next()).await {
                Ok(Some(Ok((ordinal, paid)))) => {
                    debug!(wallet = ordinal, paid, "worker settled");
                    summary.settled += 1;
                    summary.total_paid += paid;
                }
                Ok(Some(Err(e))) => error!(error = %e, "worker stop task failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        remaining = stops.len(),
                        timeout_secs = self.config.shutdown_timeout.as_secs(),
                        "shutdown timed out, abandoning remaining workers"
                    );
                    stops.abort_all();
                    break;
                }
            }
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for mut handle in tasks {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        info!(
            wallets = summary.wallets,
            settled = summary.settled,
            total_paid = summary.total_paid,
            "shutdown complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
