// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use accrue_adapters::{BalanceAck, FakeRemoteAdapter, FakeStatusSink, RemoteError};
use accrue_core::FakeClock;
use tempfile::TempDir;

const WALLET: &str = "0x1234567890";

/// Per-second accrual at the default rate with no bonus
const RATE: f64 = 75.5 * 0.0001;

/// Wall clock that follows tokio's (possibly paused) time
#[derive(Clone)]
struct TokioClock {
    origin: tokio::time::Instant,
    base_ms: u64,
}

impl TokioClock {
    fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            base_ms: 1_767_225_600_000,
        }
    }
}

impl Clock for TokioClock {
    fn epoch_ms(&self) -> u64 {
        self.base_ms + self.origin.elapsed().as_millis() as u64
    }
}

type TestDeps<C> = WorkerDeps<FakeRemoteAdapter, FakeStatusSink, C>;

fn deps<C: Clock>(dir: &TempDir, clock: C) -> TestDeps<C> {
    WorkerDeps {
        remote: FakeRemoteAdapter::new(),
        status: FakeStatusSink::new(),
        store: SessionStore::open(dir.path().join("sessions")).unwrap(),
        clock,
    }
}

fn worker<C: Clock>(deps: &TestDeps<C>) -> Worker<FakeRemoteAdapter, FakeStatusSink, C> {
    worker_with(deps, WorkerConfig::default(), CancellationToken::new())
}

fn worker_with<C: Clock>(
    deps: &TestDeps<C>,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> Worker<FakeRemoteAdapter, FakeStatusSink, C> {
    Worker::new(Identity::new(WALLET), 1, deps.clone(), config, cancel)
}

fn wallet() -> Identity {
    Identity::new(WALLET)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        retry_after: None,
        message: "unavailable".to_string(),
    }
}

#[tokio::test]
async fn cold_start_seeds_from_referral_bonus() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.5);
    let worker = worker(&deps);

    let outcome = worker.initialize().await.unwrap();

    assert_eq!(outcome, InitOutcome::Initialized);
    assert_eq!(worker.earnings().await, Earnings::seeded(0.5));
    assert_eq!(worker.referral_bonus().await, 0.5);
    assert_eq!(worker.start_time().await, Some(clock.epoch_ms()));
    assert!(worker.is_active());
}

#[tokio::test]
async fn unregistered_wallet_is_not_initialized() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, FakeClock::new());
    let worker = worker(&deps);

    let err = worker.initialize().await.unwrap_err();

    assert!(matches!(err, WorkerError::NotRegistered));
    assert!(!worker.is_active());
    assert_eq!(worker.start_time().await, None);
}

#[tokio::test]
async fn resume_restores_persisted_session() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.9);
    let record = SessionRecord {
        start_time: clock.epoch_ms() - 100_000,
        earnings: Earnings {
            total: 1.0,
            pending: 0.2,
            paid: 0.8,
        },
        referral_bonus: 0.1,
    };
    deps.store.save(&wallet(), &record).unwrap();
    let worker = worker(&deps);

    let outcome = worker.initialize().await.unwrap();

    assert_eq!(outcome, InitOutcome::Resumed);
    assert_eq!(worker.earnings().await, record.earnings);
    assert_eq!(worker.referral_bonus().await, 0.1);
    assert_eq!(worker.start_time().await, Some(record.start_time));
}

#[tokio::test]
async fn resumed_session_keeps_accruing_from_original_start() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);

    let first = worker(&deps);
    first.initialize().await.unwrap();
    let started = first.start_time().await;
    clock.advance(Duration::from_secs(100));
    first.update_balance(false).await.unwrap();
    drop(first);

    let second = worker(&deps);
    assert_eq!(second.initialize().await.unwrap(), InitOutcome::Resumed);
    assert_eq!(second.start_time().await, started);
    clock.advance(Duration::from_secs(100));
    second.update_balance(false).await.unwrap();

    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 2);
    assert_close(sent[0].earnings.pending, 100.0 * RATE);
    assert_close(sent[1].earnings.pending, 200.0 * RATE);
}

#[tokio::test]
async fn unreadable_session_falls_back_to_cold_start() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, FakeClock::new());
    deps.remote.register(&wallet(), 0.2);
    std::fs::write(
        deps.store.base_path().join(format!("session_{WALLET}.json")),
        "not json",
    )
    .unwrap();
    let worker = worker(&deps);

    let outcome = worker.initialize().await.unwrap();

    assert_eq!(outcome, InitOutcome::Initialized);
    assert_eq!(worker.earnings().await, Earnings::seeded(0.2));
}

#[tokio::test]
async fn update_before_initialize_is_an_error() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, FakeClock::new());
    let worker = worker(&deps);

    let err = worker.update_balance(false).await.unwrap_err();

    assert!(matches!(err, WorkerError::NotInitialized));
    assert!(deps.remote.updates().is_empty());
}

#[tokio::test]
async fn update_reports_pending_and_adopts_remote_total() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    deps.remote.set_balance_adjustment(0.5);
    let worker = worker(&deps);
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(100));
    let outcome = worker.update_balance(false).await.unwrap();

    let sent = deps.remote.updates_for(&wallet());
    assert_eq!(sent.len(), 1);
    assert_close(sent[0].earnings.total, 100.0 * RATE);
    assert_close(sent[0].earnings.pending, 100.0 * RATE);
    assert_eq!(sent[0].earnings.paid, 0.0);

    let UpdateOutcome::Synced { earnings } = outcome else {
        panic!("expected sync, got {outcome:?}");
    };
    assert_close(earnings.total, 100.0 * RATE + 0.5);
    assert_eq!(worker.earnings().await, earnings);

    let saved = deps.store.load(&wallet()).unwrap().unwrap();
    assert_eq!(saved.earnings, earnings);

    let report = deps.status.last_for(1).unwrap();
    assert!(!report.is_final);
    assert!(report.active);
    assert_eq!(report.masked_identity, "*********890");
    assert_close(report.uptime_secs, 100.0);
}

#[tokio::test]
async fn referral_bonus_scales_accrual() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 1.0);
    let worker = worker(&deps);
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(10));
    worker.update_balance(false).await.unwrap();

    let sent = deps.remote.updates();
    assert_close(sent[0].earnings.pending, 10.0 * RATE * 2.0);
    assert_close(sent[0].earnings.total, 1.0 + 10.0 * RATE * 2.0);
}

#[tokio::test]
async fn negligible_accrual_is_not_sent() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    let config = WorkerConfig {
        rate: AccrualRate {
            hashrate: 1.0,
            unit_factor: 5e-9,
        },
        ..WorkerConfig::default()
    };
    let worker = worker_with(&deps, config, CancellationToken::new());
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(1));
    let outcome = worker.update_balance(false).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Skipped);
    assert!(deps.remote.updates().is_empty());
}

#[tokio::test]
async fn final_update_ignores_negligible_accrual() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    let config = WorkerConfig {
        rate: AccrualRate {
            hashrate: 1.0,
            unit_factor: 5e-9,
        },
        ..WorkerConfig::default()
    };
    let worker = worker_with(&deps, config, CancellationToken::new());
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(1));
    let outcome = worker.update_balance(true).await.unwrap();

    assert!(matches!(outcome, UpdateOutcome::Synced { .. }));
    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].earnings.pending, 0.0);
    assert_close(sent[0].earnings.paid, 5e-9);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_leave_state_untouched() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    for _ in 0..3 {
        deps.remote.push_update(Err(unavailable()));
    }
    let worker = worker(&deps);
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(100));
    let err = worker.update_balance(false).await.unwrap_err();

    assert!(!err.is_rejection());
    assert!(err.to_string().contains("Balance update failed after 3 attempts"));
    assert_eq!(worker.earnings().await, Earnings::seeded(0.0));
    assert!(!deps.store.exists(&wallet()));

    // The next success accrues from the start time, with nothing counted twice
    clock.advance(Duration::from_secs(100));
    worker.update_balance(false).await.unwrap();
    assert_close(worker.earnings().await.total, 200.0 * RATE);
    assert_close(worker.earnings().await.pending, 200.0 * RATE);
}

#[tokio::test]
async fn unaccepted_update_keeps_state() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    deps.remote.push_update(Ok(BalanceAck {
        success: false,
        balance: 99.0,
    }));
    let worker = worker(&deps);
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(100));
    let outcome = worker.update_balance(false).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Rejected);
    assert_eq!(worker.earnings().await, Earnings::seeded(0.0));
    assert!(deps.status.reports().is_empty());
}

#[tokio::test]
async fn stop_settles_accrued_amount_as_paid() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    let worker = worker(&deps);
    worker.initialize().await.unwrap();

    clock.advance(Duration::from_secs(100));
    worker.update_balance(false).await.unwrap();
    clock.advance(Duration::from_secs(100));
    let paid = worker.stop().await;

    assert_close(paid, 200.0 * RATE);
    assert!(!worker.is_active());

    let last = deps.remote.updates().pop().unwrap();
    assert_eq!(last.earnings.pending, 0.0);
    assert_close(last.earnings.paid, 200.0 * RATE);

    let saved = deps.store.load(&wallet()).unwrap().unwrap();
    assert_close(saved.earnings.paid, 200.0 * RATE);
    assert_eq!(saved.earnings.pending, 0.0);

    let report = deps.status.last_for(1).unwrap();
    assert!(report.is_final);
    assert!(!report.active);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    let worker = worker(&deps);
    worker.initialize().await.unwrap();
    clock.advance(Duration::from_secs(50));

    let first = worker.stop().await;
    clock.advance(Duration::from_secs(50));
    let second = worker.stop().await;

    assert_eq!(first, second);
    assert_eq!(deps.remote.updates().len(), 1);
}

#[tokio::test]
async fn stop_before_initialize_makes_no_remote_calls() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, FakeClock::new());
    let worker = worker(&deps);

    assert_eq!(worker.stop().await, 0.0);
    assert!(deps.remote.calls().is_empty());

    deps.remote.register(&wallet(), 0.0);
    assert!(matches!(
        worker.initialize().await,
        Err(WorkerError::Stopped)
    ));
    assert!(!worker.is_active());
}

#[tokio::test]
async fn periodic_update_after_stop_is_skipped() {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let deps = deps(&dir, clock.clone());
    deps.remote.register(&wallet(), 0.0);
    let worker = worker(&deps);
    worker.initialize().await.unwrap();
    clock.advance(Duration::from_secs(10));
    worker.stop().await;

    clock.advance(Duration::from_secs(10));
    let outcome = worker.update_balance(false).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Skipped);
    assert_eq!(deps.remote.updates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_syncs_every_update_interval() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    deps.remote.register(&wallet(), 0.0);
    let worker = Arc::new(worker(&deps));
    let handle = Arc::clone(&worker).spawn();

    tokio::time::sleep(Duration::from_secs(95)).await;

    // The first tick at t=0 has nothing to send
    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 3);
    assert_close(sent[0].earnings.pending, 30.0 * RATE);
    assert_close(sent[1].earnings.pending, 60.0 * RATE);
    assert_close(sent[2].earnings.pending, 90.0 * RATE);

    worker.stop().await;
    handle.await.unwrap();
    assert_eq!(deps.remote.updates().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn initialization_is_retried_until_registered() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    let worker = Arc::new(worker(&deps));
    let handle = Arc::clone(&worker).spawn();

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(deps.remote.calls().len(), 3);
    assert!(!worker.is_active());

    deps.remote.register(&wallet(), 0.0);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(worker.is_active());
    assert_eq!(deps.remote.calls().len(), 4);

    worker.stop().await;
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unauthorized_update_pauses_for_cooldown() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    deps.remote.register(&wallet(), 0.0);
    deps.remote.push_update(Err(RemoteError::Status {
        status: 401,
        retry_after: None,
        message: "unauthorized".to_string(),
    }));
    let worker = Arc::new(worker(&deps));
    let handle = Arc::clone(&worker).spawn();

    // Rejected at t=30, then 60s cooldown plus the regular 30s interval
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(deps.remote.updates().len(), 1);
    assert_eq!(worker.consecutive_failures(), 1);

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(deps.remote.updates().len(), 2);
    assert_eq!(worker.consecutive_failures(), 0);

    worker.stop().await;
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_counted_and_cleared() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    deps.remote.register(&wallet(), 0.0);
    for _ in 0..3 {
        deps.remote.push_update(Err(unavailable()));
    }
    let worker = Arc::new(worker(&deps));
    let handle = Arc::clone(&worker).spawn();

    // Three attempts from t=30 with 1s, 2s, 4s backoff
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(deps.remote.updates().len(), 3);
    assert_eq!(worker.consecutive_failures(), 1);
    assert_eq!(worker.earnings().await, Earnings::seeded(0.0));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(deps.remote.updates().len(), 4);
    assert_eq!(worker.consecutive_failures(), 0);

    worker.stop().await;
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_update() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    deps.remote.register(&wallet(), 0.0);
    deps.remote.set_update_delay(Duration::from_secs(5));
    let worker = Arc::new(worker(&deps));
    let handle = Arc::clone(&worker).spawn();

    tokio::time::sleep(Duration::from_secs(32)).await;
    assert_eq!(deps.remote.updates().len(), 1);

    let paid = worker.stop().await;
    handle.await.unwrap();

    // Settlement runs after the in-flight tick lands at t=35
    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 2);
    assert_close(sent[1].earnings.paid, 35.0 * RATE);
    assert_close(paid, 35.0 * RATE);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(deps.remote.updates().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_ends_the_loop_without_settling() {
    let dir = TempDir::new().unwrap();
    let deps = deps(&dir, TokioClock::new());
    deps.remote.register(&wallet(), 0.0);
    let cancel = CancellationToken::new();
    let worker = Arc::new(worker_with(
        &deps,
        WorkerConfig::default(),
        cancel.child_token(),
    ));
    let handle = Arc::clone(&worker).spawn();

    tokio::time::sleep(Duration::from_secs(45)).await;
    cancel.cancel();
    handle.await.unwrap();

    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].earnings.paid, 0.0);
    assert!(!worker.is_active());
    assert_eq!(
        worker.update_balance(false).await.unwrap(),
        UpdateOutcome::Skipped
    );

    // Settlement is still owed after the loop is gone
    let paid = worker.stop().await;
    let sent = deps.remote.updates();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].earnings.pending, 0.0);
    assert!(paid > 0.0);
}
