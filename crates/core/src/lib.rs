// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! accrue-core: Core library for the accrue wallet daemon
//!
//! This crate provides:
//! - Clock abstraction for wall-clock accrual
//! - Identity parsing, loading and masking
//! - Earnings arithmetic and the settlement rules
//! - The shared retry policy for remote calls
//! - Status report formatting
//! - TOML configuration

pub mod clock;
pub mod config;
pub mod earnings;
pub mod identity;
pub mod retry;
pub mod status;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    AccrualConfig, ApiConfig, Config, ConfigError, PathsConfig, RetryConfig, TimingConfig,
};
pub use earnings::{AccrualRate, Earnings, EPSILON};
pub use identity::{parse_identities, FileIdentitySource, Identity, IdentityError, IdentitySource};
pub use retry::{retry, RetryClass, RetryError, RetryPolicy, Retryable};
pub use status::{format_uptime, StatusReport};
