// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Accrual engine: per-identity workers and their coordinator

mod coordinator;
mod error;
mod worker;

pub use coordinator::{Coordinator, CoordinatorConfig, ShutdownSummary, StartOutcome};
pub use error::{CoordinatorError, WorkerError};
pub use worker::{InitOutcome, UpdateOutcome, Worker, WorkerConfig, WorkerDeps};
