// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

/// Config rooted in `dir` that talks to a closed local port
fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.base_url = "http://127.0.0.1:9".to_string();
    config.paths.wallets = dir.path().join("wallets.txt");
    config.paths.sessions = dir.path().join("sessions");
    config.paths.log = dir.path().join("accrued.log");
    config
}

#[tokio::test]
async fn startup_without_wallets_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(
        err,
        LifecycleError::Coordinator(CoordinatorError::Identities(_))
    ));
}

#[tokio::test]
async fn startup_without_valid_wallets_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    std::fs::write(&config.paths.wallets, "not-a-wallet\n\n").unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(
        err,
        LifecycleError::Coordinator(CoordinatorError::NoIdentities)
    ));
    assert_eq!(err.to_string(), "No valid wallets found");
}

#[tokio::test]
async fn startup_creates_session_dir_and_shuts_down_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    std::fs::write(&config.paths.wallets, "0xaaa\nbad\n0xbbb\n").unwrap();

    let daemon = startup(&config).await.unwrap();
    assert_eq!(daemon.wallets, 2);
    assert!(config.paths.sessions.is_dir());

    let summary = daemon.shutdown().await.unwrap();
    assert_eq!(summary.wallets, 2);
    assert_eq!(summary.total_paid, 0.0);

    assert!(matches!(
        daemon.shutdown().await,
        Err(LifecycleError::Coordinator(
            CoordinatorError::AlreadyShuttingDown
        ))
    ));
}
