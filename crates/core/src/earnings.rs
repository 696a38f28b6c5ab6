// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Earnings arithmetic
//!
//! Accrual is a pure function of elapsed wall-clock time and the bonus
//! multiplier, so a resumed session reproduces the same trajectory as one
//! that never stopped. Locally computed totals are only candidates: the
//! remote side's confirmed balance always replaces them.

use serde::{Deserialize, Serialize};

/// Non-final updates accruing less than this are not sent
pub const EPSILON: f64 = 1e-8;

/// Accrual state for one identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Earnings {
    pub total: f64,
    pub pending: f64,
    pub paid: f64,
}

impl Earnings {
    /// Cold-start state seeded from the remote referral bonus
    pub fn seeded(bonus: f64) -> Self {
        Self {
            total: bonus,
            pending: 0.0,
            paid: 0.0,
        }
    }

    /// Totals to propose to the remote side for `accrued`.
    ///
    /// A final update folds the accrued amount into `paid` and clears
    /// `pending`; a periodic one reports it as `pending`.
    pub fn candidate(&self, accrued: f64, is_final: bool) -> Self {
        if is_final {
            Self {
                total: self.total + accrued,
                pending: 0.0,
                paid: self.paid + accrued,
            }
        } else {
            Self {
                total: self.total + accrued,
                pending: accrued,
                paid: self.paid,
            }
        }
    }

    /// Adopt the remote-confirmed total, keeping the candidate's bookkeeping
    pub fn confirm(candidate: Self, remote_total: f64) -> Self {
        Self {
            total: remote_total,
            ..candidate
        }
    }
}

/// Fixed production parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccrualRate {
    /// Simulated production rate (MH/s)
    pub hashrate: f64,
    /// Scale from rate-seconds to earnings units
    pub unit_factor: f64,
}

impl Default for AccrualRate {
    fn default() -> Self {
        Self {
            hashrate: 75.5,
            unit_factor: 0.0001,
        }
    }
}

impl AccrualRate {
    /// Amount accrued after `elapsed_secs` with the given bonus multiplier
    pub fn accrued(&self, elapsed_secs: f64, bonus: f64) -> f64 {
        let elapsed = elapsed_secs.max(0.0);
        self.hashrate * elapsed * self.unit_factor * (1.0 + bonus)
    }
}

#[cfg(test)]
#[path = "earnings_tests.rs"]
mod tests;
