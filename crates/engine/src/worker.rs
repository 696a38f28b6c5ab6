// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-wallet worker: registration, session restore, periodic sync, settlement
//!
//! All mutation of a worker's accrual state happens under one async mutex.
//! The periodic tick holds it for the whole remote round-trip, so `stop()`
//! waits for an in-flight tick and the settlement can never be followed by
//! another periodic update: ticks re-check the activity flag under the lock.

use crate::error::WorkerError;
use accrue_adapters::{BalanceUpdate, RemoteAdapter, StatusSink};
use accrue_core::{
    retry, AccrualRate, Clock, Config, Earnings, Identity, RetryPolicy, StatusReport, EPSILON,
};
use accrue_storage::{SessionRecord, SessionStore};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Worker timing and accrual parameters
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub update_interval: Duration,
    pub error_cooldown: Duration,
    pub init_retry_delay: Duration,
    pub retry: RetryPolicy,
    pub rate: AccrualRate,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl WorkerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            update_interval: config.timing.update_interval,
            error_cooldown: config.timing.error_cooldown,
            init_retry_delay: config.timing.init_retry_delay,
            retry: config.retry_policy(),
            rate: config.accrual_rate(),
        }
    }
}

/// Collaborators shared by every worker
#[derive(Clone)]
pub struct WorkerDeps<R, S, C> {
    pub remote: R,
    pub status: S,
    pub store: SessionStore,
    pub clock: C,
}

/// How `initialize()` obtained its starting state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// No prior session; seeded from the registration bonus
    Initialized,
    /// Restored from the persisted session
    Resumed,
}

/// Result of one `update_balance` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Nothing worth sending, or the worker is no longer active
    Skipped,
    /// The service confirmed the update
    Synced { earnings: Earnings },
    /// The service answered but reported `success: false`
    Rejected,
}

#[derive(Debug, Default)]
struct WorkerState {
    earnings: Earnings,
    referral_bonus: f64,
    /// Loop start, epoch ms; `None` until initialized
    start_time: Option<u64>,
    /// Final settlement has run (or been attempted)
    settled: bool,
}

/// Drives one wallet identity
pub struct Worker<R, S, C> {
    identity: Identity,
    ordinal: usize,
    deps: WorkerDeps<R, S, C>,
    config: WorkerConfig,
    state: Mutex<WorkerState>,
    active: AtomicBool,
    consecutive_failures: AtomicU32,
    cancel: CancellationToken,
}

impl<R, S, C> Worker<R, S, C>
where
    R: RemoteAdapter,
    S: StatusSink,
    C: Clock,
{
    pub fn new(
        identity: Identity,
        ordinal: usize,
        deps: WorkerDeps<R, S, C>,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            identity,
            ordinal,
            deps,
            config,
            state: Mutex::new(WorkerState::default()),
            active: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            cancel,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Failed ticks since the last successful sync
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub async fn earnings(&self) -> Earnings {
        self.state.lock().await.earnings
    }

    pub async fn start_time(&self) -> Option<u64> {
        self.state.lock().await.start_time
    }

    pub async fn referral_bonus(&self) -> f64 {
        self.state.lock().await.referral_bonus
    }

    /// Spawn `run` as a background task
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Initialize (retrying forever) and then run the update loop until
    /// cancelled
    pub async fn run(&self) {
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.initialize() => result,
            };
            match result {
                Ok(_) => break,
                Err(WorkerError::Stopped) => return,
                Err(e) => {
                    error!(wallet = self.ordinal, error = %e, "initialization failed");
                    info!(
                        wallet = self.ordinal,
                        delay_secs = self.config.init_retry_delay.as_secs(),
                        "retrying initialization"
                    );
                    if !self.pause(self.config.init_retry_delay).await {
                        return;
                    }
                }
            }
        }

        self.update_loop().await;
    }

    /// Check registration, then restore or seed accrual state
    pub async fn initialize(&self) -> Result<InitOutcome, WorkerError> {
        let registration = retry(&self.config.retry, "Registration check", || {
            self.deps.remote.check_registration(&self.identity)
        })
        .await?;

        if !registration.is_registered {
            return Err(WorkerError::NotRegistered);
        }

        let mut state = self.state.lock().await;
        if state.settled || self.cancel.is_cancelled() {
            return Err(WorkerError::Stopped);
        }

        let outcome = match self.load_session() {
            Some(record) => {
                state.start_time = Some(record.start_time);
                state.earnings = record.earnings;
                state.referral_bonus = record.referral_bonus;
                InitOutcome::Resumed
            }
            None => {
                let bonus = registration.referral_bonus();
                state.referral_bonus = bonus;
                state.earnings = Earnings::seeded(bonus);
                state.start_time = Some(self.deps.clock.epoch_ms());
                InitOutcome::Initialized
            }
        };
        self.active.store(true, Ordering::SeqCst);

        match outcome {
            InitOutcome::Resumed => info!(wallet = self.ordinal, "mining resumed"),
            InitOutcome::Initialized => info!(wallet = self.ordinal, "mining initialized"),
        }
        Ok(outcome)
    }

    /// Compute accrual since start and sync it with the service
    pub async fn update_balance(&self, is_final: bool) -> Result<UpdateOutcome, WorkerError> {
        let mut state = self.state.lock().await;
        self.update_locked(&mut state, is_final).await
    }

    /// Deactivate, settle, persist, and return the cumulative paid amount.
    ///
    /// Safe to call repeatedly and concurrently with the update loop; only
    /// the first call settles.
    pub async fn stop(&self) -> f64 {
        self.cancel.cancel();
        self.active.store(false, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        if state.settled {
            return state.earnings.paid;
        }
        state.settled = true;

        if state.start_time.is_none() {
            info!(wallet = self.ordinal, "stopped before initialization");
            return state.earnings.paid;
        }

        match self.update_locked(&mut state, true).await {
            Ok(UpdateOutcome::Synced { .. }) => {}
            Ok(outcome) => warn!(wallet = self.ordinal, ?outcome, "final settlement not confirmed"),
            Err(e) => error!(wallet = self.ordinal, error = %e, "final settlement failed"),
        }
        self.save_session(&state);
        state.earnings.paid
    }

    async fn update_locked(
        &self,
        state: &mut WorkerState,
        is_final: bool,
    ) -> Result<UpdateOutcome, WorkerError> {
        let start_time = state.start_time.ok_or(WorkerError::NotInitialized)?;
        if !is_final && !self.is_active() {
            return Ok(UpdateOutcome::Skipped);
        }

        let elapsed = self.deps.clock.seconds_since(start_time);
        let accrued = self.config.rate.accrued(elapsed, state.referral_bonus);
        if !is_final && accrued < EPSILON {
            return Ok(UpdateOutcome::Skipped);
        }

        let candidate = state.earnings.candidate(accrued, is_final);
        let update = BalanceUpdate {
            wallet: self.identity.clone(),
            earnings: candidate,
        };
        let ack = retry(&self.config.retry, "Balance update", || {
            self.deps.remote.update_balance(&update)
        })
        .await?;

        if !ack.success {
            warn!(wallet = self.ordinal, "balance update not accepted");
            return Ok(UpdateOutcome::Rejected);
        }

        state.earnings = Earnings::confirm(candidate, ack.balance);
        self.save_session(state);
        self.report(state, is_final);
        Ok(UpdateOutcome::Synced {
            earnings: state.earnings,
        })
    }

    async fn update_loop(&self) {
        while self.is_active() {
            match self.update_balance(false).await {
                Ok(UpdateOutcome::Synced { .. }) => {
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                }
                Ok(_) => {}
                Err(e) => {
                    let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                    error!(wallet = self.ordinal, failures, error = %e, "update failed");
                    if e.is_rejection() {
                        warn!(
                            wallet = self.ordinal,
                            cooldown_secs = self.config.error_cooldown.as_secs(),
                            "API error detected, switching to offline mode"
                        );
                        if !self.pause(self.config.error_cooldown).await {
                            break;
                        }
                    }
                }
            }
            if !self.pause(self.config.update_interval).await {
                break;
            }
        }
        // Cancelled workers no longer accrue; stop() still settles them
        self.active.store(false, Ordering::SeqCst);
        debug!(wallet = self.ordinal, "update loop exited");
    }

    /// Sleep for `duration`; false if cancelled first
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn load_session(&self) -> Option<SessionRecord> {
        match self.deps.store.load(&self.identity) {
            Ok(record) => {
                if record.is_some() {
                    info!(wallet = self.ordinal, "previous session loaded");
                }
                record
            }
            Err(e) => {
                warn!(wallet = self.ordinal, error = %e, "ignoring unreadable session");
                None
            }
        }
    }

    fn save_session(&self, state: &WorkerState) {
        let Some(start_time) = state.start_time else {
            return;
        };
        let record = SessionRecord {
            start_time,
            earnings: state.earnings,
            referral_bonus: state.referral_bonus,
        };
        if let Err(e) = self.deps.store.save(&self.identity, &record) {
            error!(wallet = self.ordinal, error = %e, "failed to save session");
        }
    }

    fn report(&self, state: &WorkerState, is_final: bool) {
        let uptime_secs = state
            .start_time
            .map(|start| self.deps.clock.seconds_since(start))
            .unwrap_or(0.0);
        self.deps.status.report(&StatusReport {
            ordinal: self.ordinal,
            masked_identity: self.identity.masked(),
            uptime_secs,
            active: self.is_active(),
            hashrate: self.config.rate.hashrate,
            earnings: state.earnings,
            referral_bonus: state.referral_bonus,
            is_final,
        });
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
