// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status report sinks

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatusSink;

use accrue_core::StatusReport;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};

/// Destination for worker status reports
pub trait StatusSink: Clone + Send + Sync + 'static {
    fn report(&self, report: &StatusReport);
}

/// Prints each report as a table on stdout
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleStatusSink {
    colored: bool,
}

impl ConsoleStatusSink {
    /// Colors the table when stdout is a terminal
    pub fn new() -> Self {
        Self {
            colored: std::io::stdout().is_terminal(),
        }
    }

    fn render(&self, report: &StatusReport) -> String {
        if self.colored {
            render_colored(report)
        } else {
            report.to_string()
        }
    }
}

impl StatusSink for ConsoleStatusSink {
    fn report(&self, report: &StatusReport) {
        // One write per report so concurrent workers don't interleave rows
        let text = format!("{}\n", self.render(report));
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()) {
            tracing::debug!(error = %e, "failed to write status report");
        }
    }
}

/// Title in yellow with the masked wallet highlighted, data cells colored
/// per column. Borders and headers stay plain.
fn render_colored(report: &StatusReport) -> String {
    let title = report.title();
    let heading = title
        .strip_suffix(report.masked_identity.as_str())
        .unwrap_or(&title);
    let table = report.table_styled(|column, cell| match column {
        0..=2 => cell.green().to_string(),
        3 => cell.cyan().to_string(),
        4 => cell.yellow().to_string(),
        5 => cell.truecolor(255, 165, 0).to_string(),
        _ => cell.to_string(),
    });
    format!(
        "{}{}\n{}",
        heading.yellow(),
        report.masked_identity.bright_green(),
        table
    )
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
