use std::sync::Arc;
use std::time::Duration;

use ipchanger_core::{ApplierConfig, ApplyState, ConnectionApplier, CycleWarning};
use ipchanger_storage::{validate, Profile, ProfileInput};
use log::LevelFilter;
use tokio::time::timeout;

mod common;
use common::fake_runner::{FakeResponse, FakeRunner};

fn init_logs() {
    //   Logs will appear only when you run with `-- --nocapture`
    //   or when the test fails.
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

fn profile(name: &str, ip: &str) -> Profile {
    validate(ProfileInput {
        id: None,
        name: name.into(),
        ip: ip.into(),
        subnet: "24".into(),
        gateway: "192.168.1.1".into(),
        dns: String::new(),
    })
    .expect("fixture profile is valid")
}

fn applier(runner: &Arc<FakeRunner>, delay: Duration) -> ConnectionApplier {
    ConnectionApplier::with_runner(
        ApplierConfig {
            cycle_delay: delay,
            ..ApplierConfig::default()
        },
        runner.clone(),
    )
}

#[tokio::test]
async fn failed_up_is_a_warning_not_an_apply_failure() {
    init_logs();
    let runner = Arc::new(
        FakeRunner::with_active("eth0\n")
            .respond("down", FakeResponse::fail("not active"))
            .respond("up", FakeResponse::fail("no carrier")),
    );
    let applier = applier(&runner, Duration::from_millis(10));

    let outcome = applier
        .apply_profile(&profile("Home", "192.168.1.50"))
        .await
        .expect("modify succeeded, so the apply succeeds");

    let warning = outcome.cycle.wait().await.expect_err("up failed");
    match warning {
        CycleWarning::UpFailed { connection, stderr } => {
            assert_eq!(connection, "eth0");
            assert_eq!(stderr, "no carrier");
        }
        other => panic!("expected UpFailed, got {other:?}"),
    }
    assert_eq!(runner.verbs(), ["show", "modify", "down", "up"], "up runs after a failed down");
    assert_eq!(applier.state(), ApplyState::Done);
}

#[tokio::test]
async fn cancelled_cycle_never_brings_the_connection_up() {
    init_logs();
    let runner = Arc::new(FakeRunner::with_active("eth0\n"));
    let applier = applier(&runner, Duration::from_secs(60));

    let outcome = applier
        .apply_profile(&profile("Home", "192.168.1.50"))
        .await
        .expect("apply");
    tokio::time::sleep(Duration::from_millis(20)).await;
    outcome.cycle.cancel();

    let result = timeout(Duration::from_secs(1), outcome.cycle.wait())
        .await
        .expect("cancelled cycle resolves promptly");

    assert!(matches!(result, Err(CycleWarning::Cancelled)), "got {result:?}");
    assert!(runner.calls("up").is_empty());
    assert_eq!(applier.state(), ApplyState::Idle);
}

#[tokio::test]
async fn cancel_pending_cycle_releases_the_next_apply() {
    init_logs();
    let runner = Arc::new(FakeRunner::with_active("eth0\n"));
    let applier = applier(&runner, Duration::from_secs(60));

    let first = applier
        .apply_profile(&profile("Home", "192.168.1.50"))
        .await
        .expect("first apply");
    assert!(!first.cycle.is_finished());

    // A second apply queues behind the first cycle …
    let second = tokio::spawn({
        let applier = applier.clone();
        async move { applier.reset_to_dhcp().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.calls("modify").len(), 1, "second apply must wait");

    // … until the pending cycle is cancelled (e.g. on shutdown).
    assert!(applier.cancel_pending_cycle());
    let second = timeout(Duration::from_secs(1), second)
        .await
        .expect("second apply proceeds after cancel")
        .expect("task joined")
        .expect("second apply succeeds");

    assert_eq!(runner.calls("modify").len(), 2);
    assert!(matches!(first.cycle.wait().await, Err(CycleWarning::Cancelled)));
    second.cycle.cancel();
}

#[tokio::test]
async fn back_to_back_applies_do_not_interleave_cycles() {
    init_logs();
    let runner = Arc::new(FakeRunner::with_active("eth0\n"));
    let applier = applier(&runner, Duration::from_millis(40));

    let a = tokio::spawn({
        let applier = applier.clone();
        async move {
            let outcome = applier.apply_profile(&profile("A", "192.168.1.10")).await?;
            let _ = outcome.cycle.wait().await;
            Ok::<_, ipchanger_core::ApplyError>(())
        }
    });
    let b = tokio::spawn({
        let applier = applier.clone();
        async move {
            let outcome = applier.apply_profile(&profile("B", "192.168.1.20")).await?;
            let _ = outcome.cycle.wait().await;
            Ok::<_, ipchanger_core::ApplyError>(())
        }
    });

    let (a, b) = tokio::join!(a, b);
    a.expect("join a").expect("apply a");
    b.expect("join b").expect("apply b");

    assert_eq!(
        runner.verbs(),
        ["show", "modify", "down", "up", "show", "modify", "down", "up"],
        "the second request must start only after the first cycle finished"
    );
}

#[tokio::test]
async fn nothing_to_cancel_when_idle() {
    let runner = Arc::new(FakeRunner::with_active("eth0\n"));
    let applier = applier(&runner, Duration::from_millis(1));
    assert!(!applier.cancel_pending_cycle());

    let outcome = applier.reset_to_dhcp().await.expect("reset");
    outcome.cycle.wait().await.expect("cycle");
    assert!(!applier.cancel_pending_cycle(), "finished cycles are not cancelled");
}
