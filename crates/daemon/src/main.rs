// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accrual daemon (accrued)
//!
//! Runs one worker per wallet until interrupted, then settles every worker
//! and prints a final summary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::path::PathBuf;

use accrue_core::Config;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::lifecycle::LifecycleError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config path; otherwise accrue.toml in the working directory
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let cwd = std::env::current_dir()?;
    let config = Config::discover(explicit.as_deref(), &cwd)?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!(
        wallets = %config.paths.wallets.display(),
        "Starting accrued"
    );

    // Installed before workers start so an early interrupt still settles
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            write_startup_error(&config, &e);
            error!("Failed to start: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    println!("Loaded {} wallets", daemon.wallets);

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
    println!("Shutting down miners...");

    // Further signals while settling are logged, not acted on
    let shutdown = daemon.shutdown();
    tokio::pin!(shutdown);
    let summary = loop {
        tokio::select! {
            result = &mut shutdown => break result?,
            _ = sigterm.recv() => warn!("shutdown already in progress"),
            _ = sigint.recv() => warn!("shutdown already in progress"),
        }
    };

    println!("{}", summary);
    if summary.settled < summary.wallets {
        warn!(
            unsettled = summary.wallets - summary.settled,
            "some workers did not settle before the shutdown timeout"
        );
    }

    info!("accrued stopped");
    drop(log_guard);
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- accrued: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- accrued: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.paths.log.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.paths.log)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// Tracing is non-blocking and may not flush before exit.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.paths.log)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

    let log_path = &config.paths.log;
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    let file_name = log_path.file_name().ok_or(LifecycleError::NoLogDir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_filter(filter))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(guard)
}
