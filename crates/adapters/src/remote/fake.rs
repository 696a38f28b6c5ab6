// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake remote adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BalanceAck, BalanceUpdate, Registration, RemoteAdapter, RemoteError};
use accrue_core::Identity;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded remote call
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    CheckRegistration { wallet: Identity },
    UpdateBalance(BalanceUpdate),
}

#[derive(Default)]
struct FakeRemoteState {
    /// Registered wallets and their referral bonus
    registered: HashMap<Identity, f64>,
    /// Scripted registration responses, consumed before the default
    registration_script: VecDeque<Result<Registration, RemoteError>>,
    /// Scripted update responses, consumed before the default
    update_script: VecDeque<Result<BalanceAck, RemoteError>>,
    /// Added to the proposed total when acknowledging by default
    balance_adjustment: f64,
    /// Simulated latency for update calls
    update_delay: Option<Duration>,
    calls: Vec<RemoteCall>,
}

/// Fake remote adapter for testing
///
/// By default unknown wallets are unregistered and updates succeed with the
/// proposed total echoed back as the balance.
#[derive(Clone, Default)]
pub struct FakeRemoteAdapter {
    state: Arc<Mutex<FakeRemoteState>>,
}

impl FakeRemoteAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeRemoteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark `wallet` as registered with the given bonus
    pub fn register(&self, wallet: &Identity, referral_bonus: f64) {
        self.lock().registered.insert(wallet.clone(), referral_bonus);
    }

    /// Queue a response for the next registration check
    pub fn push_registration(&self, result: Result<Registration, RemoteError>) {
        self.lock().registration_script.push_back(result);
    }

    /// Queue a response for the next balance update
    pub fn push_update(&self, result: Result<BalanceAck, RemoteError>) {
        self.lock().update_script.push_back(result);
    }

    /// Make default acknowledgements report `proposed total + adjustment`
    pub fn set_balance_adjustment(&self, adjustment: f64) {
        self.lock().balance_adjustment = adjustment;
    }

    /// Delay every update call by `delay` (uses tokio time)
    pub fn set_update_delay(&self, delay: Duration) {
        self.lock().update_delay = Some(delay);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Recorded balance updates, in order
    pub fn updates(&self) -> Vec<BalanceUpdate> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::UpdateBalance(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded balance updates for one wallet
    pub fn updates_for(&self, wallet: &Identity) -> Vec<BalanceUpdate> {
        self.updates()
            .into_iter()
            .filter(|u| &u.wallet == wallet)
            .collect()
    }
}

#[async_trait]
impl RemoteAdapter for FakeRemoteAdapter {
    async fn check_registration(&self, wallet: &Identity) -> Result<Registration, RemoteError> {
        let mut state = self.lock();
        state.calls.push(RemoteCall::CheckRegistration {
            wallet: wallet.clone(),
        });
        if let Some(result) = state.registration_script.pop_front() {
            return result;
        }
        Ok(match state.registered.get(wallet) {
            Some(bonus) => Registration::registered(*bonus),
            None => Registration::unregistered(),
        })
    }

    async fn update_balance(&self, update: &BalanceUpdate) -> Result<BalanceAck, RemoteError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(RemoteCall::UpdateBalance(update.clone()));
            state.update_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(result) = state.update_script.pop_front() {
            return result;
        }
        Ok(BalanceAck {
            success: true,
            balance: update.earnings.total + state.balance_adjustment,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
