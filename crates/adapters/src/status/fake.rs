// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake status sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::StatusSink;
use accrue_core::StatusReport;
use std::sync::{Arc, Mutex};

/// Records every report it receives
#[derive(Clone, Default)]
pub struct FakeStatusSink {
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

impl FakeStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded reports
    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Most recent report for the worker with `ordinal`
    pub fn last_for(&self, ordinal: usize) -> Option<StatusReport> {
        self.reports()
            .into_iter()
            .rev()
            .find(|r| r.ordinal == ordinal)
    }
}

impl StatusSink for FakeStatusSink {
    fn report(&self, report: &StatusReport) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
