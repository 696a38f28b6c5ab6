// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::remote::{BalanceAck, BalanceUpdate, Registration, RemoteAdapter, RemoteError};
use accrue_core::Identity;
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any RemoteAdapter
#[derive(Clone)]
pub struct TracedRemoteAdapter<R> {
    inner: R,
}

impl<R> TracedRemoteAdapter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RemoteAdapter> RemoteAdapter for TracedRemoteAdapter<R> {
    async fn check_registration(&self, wallet: &Identity) -> Result<Registration, RemoteError> {
        let span = tracing::info_span!("remote.check_registration", wallet = %wallet.masked());
        async {
            let start = std::time::Instant::now();
            let result = self.inner.check_registration(wallet).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(reg) => tracing::debug!(
                    elapsed_ms,
                    registered = reg.is_registered,
                    referral_bonus = reg.referral_bonus(),
                    "registration checked"
                ),
                Err(e) => tracing::warn!(
                    elapsed_ms,
                    status = ?e.status(),
                    error = %e,
                    "registration check failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn update_balance(&self, update: &BalanceUpdate) -> Result<BalanceAck, RemoteError> {
        let span = tracing::info_span!("remote.update_balance", wallet = %update.wallet.masked());
        async {
            tracing::trace!(
                total = update.earnings.total,
                pending = update.earnings.pending,
                paid = update.earnings.paid,
                "sending"
            );
            let start = std::time::Instant::now();
            let result = self.inner.update_balance(update).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(ack) => tracing::debug!(
                    elapsed_ms,
                    success = ack.success,
                    balance = ack.balance,
                    "balance updated"
                ),
                Err(e) => tracing::warn!(
                    elapsed_ms,
                    status = ?e.status(),
                    error = %e,
                    "balance update failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
