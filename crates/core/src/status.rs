// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-facing status reports

use crate::earnings::Earnings;
use std::fmt;

/// Unit suffix for reported amounts
pub const UNIT: &str = "KLDO";

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;

/// Format an uptime as `[nMO:][nW:][nD:]nH:nM:nS`.
///
/// Months, weeks and days are omitted when zero; hours, minutes and seconds
/// always appear. Fractional seconds are truncated.
pub fn format_uptime(seconds: f64) -> String {
    let mut sec = seconds.max(0.0) as u64;
    let months = sec / MONTH;
    sec %= MONTH;
    let weeks = sec / WEEK;
    sec %= WEEK;
    let days = sec / DAY;
    sec %= DAY;
    let hours = sec / HOUR;
    sec %= HOUR;
    let minutes = sec / MINUTE;
    let secs = sec % MINUTE;

    let mut parts = Vec::with_capacity(6);
    if months > 0 {
        parts.push(format!("{months}MO"));
    }
    if weeks > 0 {
        parts.push(format!("{weeks}W"));
    }
    if days > 0 {
        parts.push(format!("{days}D"));
    }
    parts.push(format!("{hours}H"));
    parts.push(format!("{minutes}M"));
    parts.push(format!("{secs}S"));
    parts.join(":")
}

/// Snapshot of one worker after a successful sync
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// 1-based worker label
    pub ordinal: usize,
    /// Identity with all but the last three characters hidden
    pub masked_identity: String,
    pub uptime_secs: f64,
    pub active: bool,
    pub hashrate: f64,
    pub earnings: Earnings,
    pub referral_bonus: f64,
    /// Whether this report follows the settlement update
    pub is_final: bool,
}

impl StatusReport {
    pub fn title(&self) -> String {
        let kind = if self.is_final {
            "Final Status"
        } else {
            "Mining Status"
        };
        format!(
            "[Wallet {}] {} for Wallet: {}",
            self.ordinal, kind, self.masked_identity
        )
    }

    /// Column headers and the single data row
    fn columns(&self) -> [(&'static str, String); 7] {
        [
            ("Uptime", format_uptime(self.uptime_secs)),
            ("Active", self.active.to_string()),
            ("Hashrate", format!("{} MH/s", self.hashrate)),
            ("Total", format!("{:.8} {UNIT}", self.earnings.total)),
            ("Pending", format!("{:.8} {UNIT}", self.earnings.pending)),
            ("Paid", format!("{:.8} {UNIT}", self.earnings.paid)),
            (
                "Referral Bonus",
                format!("+{:.1}%", self.referral_bonus * 100.0),
            ),
        ]
    }

    /// Horizontal ASCII table: border, header, border, data, border
    pub fn table(&self) -> String {
        self.table_styled(|_, cell| cell.to_string())
    }

    /// Like [`table`](Self::table), but each padded data cell is passed to
    /// `style` with its column index. Widths are computed on the plain text.
    pub fn table_styled<F>(&self, style: F) -> String
    where
        F: Fn(usize, &str) -> String,
    {
        let columns = self.columns();
        let widths: Vec<usize> = columns
            .iter()
            .map(|(header, value)| header.chars().count().max(value.chars().count()) + 2)
            .collect();

        let border = format!(
            "+{}+",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("+")
        );
        let pad = |cell: &str, w: usize| format!("{:<width$}", cell, width = w - 1);
        let header = format!(
            "|{}|",
            columns
                .iter()
                .zip(&widths)
                .map(|((h, _), w)| format!(" {}", pad(*h, *w)))
                .collect::<Vec<_>>()
                .join("|")
        );
        let data = format!(
            "|{}|",
            columns
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, ((_, v), w))| format!(" {}", style(i, &pad(v.as_str(), *w))))
                .collect::<Vec<_>>()
                .join("|")
        );

        [
            border.as_str(),
            header.as_str(),
            border.as_str(),
            data.as_str(),
            border.as_str(),
        ]
        .join("\n")
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.title(), self.table())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
