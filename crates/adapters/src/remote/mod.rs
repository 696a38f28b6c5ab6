// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote earnings service adapters

mod http;

pub use http::HttpRemoteAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemoteAdapter, RemoteCall};

use accrue_core::{Earnings, Identity, RetryClass, Retryable};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Response to `GET /check-registration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub is_registered: bool,
    #[serde(default)]
    pub user_data: Option<UserData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub referral_bonus: Option<f64>,
}

impl Registration {
    pub fn registered(referral_bonus: f64) -> Self {
        Self {
            is_registered: true,
            user_data: Some(UserData {
                referral_bonus: Some(referral_bonus),
            }),
        }
    }

    pub fn unregistered() -> Self {
        Self {
            is_registered: false,
            user_data: None,
        }
    }

    /// Bonus multiplier reported by the service, `0` when absent
    pub fn referral_bonus(&self) -> f64 {
        self.user_data
            .as_ref()
            .and_then(|d| d.referral_bonus)
            .unwrap_or(0.0)
    }
}

/// Body of `POST /update-balance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub wallet: Identity,
    pub earnings: Earnings,
}

/// Response to `POST /update-balance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceAck {
    pub success: bool,
    /// Authoritative total held by the service
    #[serde(default)]
    pub balance: f64,
}

/// Errors from remote operations
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("request failed with status {status}: {message}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Retryable for RemoteError {
    fn classify(&self) -> RetryClass {
        match self {
            RemoteError::Status {
                status: 400 | 401, ..
            } => RetryClass::Fatal,
            RemoteError::Status { retry_after, .. } => RetryClass::Transient {
                retry_after: *retry_after,
            },
            RemoteError::Transport(_) | RemoteError::Decode(_) => {
                RetryClass::Transient { retry_after: None }
            }
        }
    }
}

/// Adapter for the remote earnings service
#[async_trait]
pub trait RemoteAdapter: Clone + Send + Sync + 'static {
    /// Look up whether `wallet` is registered and its referral bonus
    async fn check_registration(&self, wallet: &Identity) -> Result<Registration, RemoteError>;

    /// Propose new totals; the service answers with its own balance
    async fn update_balance(&self, update: &BalanceUpdate) -> Result<BalanceAck, RemoteError>;
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
