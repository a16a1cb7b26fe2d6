use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use critter_countdown::{
    action_fn, Fire, MonotonicClock, Watchdog, WatchdogError, WatchdogState, WatchdogTask,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

// ── State machine ───────────────────────────────────────────────

#[test]
fn new_watchdog_is_idle() {
    let mut watchdog = Watchdog::new();
    assert_eq!(watchdog.state(), WatchdogState::Idle);
    assert_eq!(watchdog.observe(t0()), None);
}

#[test]
fn fires_once_when_deadline_passes() {
    let deadline = t0() + TimeDelta::seconds(10);
    let mut watchdog = Watchdog::armed(deadline);

    assert_eq!(watchdog.observe(t0()), None);
    assert_eq!(watchdog.observe(deadline), Some(Fire { deadline }));
    assert_eq!(watchdog.state(), WatchdogState::Firing);

    // further expiry signals while the action runs are ignored
    for secs in 11..20 {
        assert_eq!(watchdog.observe(t0() + TimeDelta::seconds(secs)), None);
    }
    assert_eq!(watchdog.fire_count(), 1);
}

#[test]
fn settle_with_fresh_deadline_rearms() {
    let mut watchdog = Watchdog::armed(t0());
    watchdog.observe(t0());

    let next = t0() + TimeDelta::minutes(10);
    watchdog.settle(Ok(Some(next)));
    assert_eq!(watchdog.state(), WatchdogState::Armed(next));

    assert_eq!(watchdog.observe(next), Some(Fire { deadline: next }));
    assert_eq!(watchdog.fire_count(), 2);
}

#[test]
fn settle_with_error_goes_idle_and_keeps_message() {
    let mut watchdog = Watchdog::armed(t0());
    watchdog.observe(t0());

    watchdog.settle(Err("link code service unavailable".into()));
    assert_eq!(watchdog.state(), WatchdogState::Idle);
    assert_eq!(watchdog.last_error(), Some("link code service unavailable"));

    // no automatic retry
    assert_eq!(watchdog.observe(t0() + TimeDelta::hours(1)), None);
}

#[test]
fn success_clears_previous_error() {
    let mut watchdog = Watchdog::armed(t0());
    watchdog.observe(t0());
    watchdog.settle(Err("boom".into()));

    watchdog.arm(t0());
    watchdog.observe(t0());
    watchdog.settle(Ok(None));
    assert_eq!(watchdog.last_error(), None);
    assert_eq!(watchdog.state(), WatchdogState::Idle);
}

#[test]
fn arm_is_ignored_while_firing() {
    let mut watchdog = Watchdog::armed(t0());
    watchdog.observe(t0());

    assert!(!watchdog.arm(t0() + TimeDelta::minutes(5)));
    assert_eq!(watchdog.state(), WatchdogState::Firing);
}

#[test]
fn disarm_stops_watching() {
    let mut watchdog = Watchdog::armed(t0());
    watchdog.disarm();
    assert_eq!(watchdog.state(), WatchdogState::Idle);
    assert_eq!(watchdog.observe(t0() + TimeDelta::hours(1)), None);
}

#[test]
fn settle_outside_firing_is_ignored() {
    let deadline = t0() + TimeDelta::minutes(1);
    let mut watchdog = Watchdog::armed(deadline);
    watchdog.settle(Err("stray".into()));
    assert_eq!(watchdog.state(), WatchdogState::Armed(deadline));
    assert_eq!(watchdog.last_error(), None);
}

// ── Task ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn task_invokes_action_exactly_once_per_expiry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (release_tx, release_rx) = mpsc::channel::<Result<Option<DateTime<Utc>>, WatchdogError>>(4);
    let release_rx = Arc::new(Mutex::new(release_rx));

    let action = {
        let calls = Arc::clone(&calls);
        let release_rx = Arc::clone(&release_rx);
        action_fn(move |_expired| {
            let calls = Arc::clone(&calls);
            let release_rx = Arc::clone(&release_rx);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                release_rx
                    .lock()
                    .await
                    .recv()
                    .await
                    .unwrap_or(Err(WatchdogError::Stopped))
            }
        })
    };

    let clock = Arc::new(MonotonicClock::anchored_at(t0()));
    let handle = WatchdogTask::spawn(
        Watchdog::armed(t0() + TimeDelta::seconds(2)),
        action,
        clock,
        Duration::from_secs(1),
    );
    let mut status = handle.subscribe();

    status
        .wait_for(|s| s.state == WatchdogState::Firing)
        .await
        .unwrap();

    // many ticks pass while the action is still running
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(handle.status().state, WatchdogState::Firing);

    // the action settles with a fresh deadline 10 minutes out
    let next = t0() + TimeDelta::seconds(32 + 600);
    release_tx.send(Ok(Some(next))).await.unwrap();
    status
        .wait_for(|s| s.state == WatchdogState::Armed(next))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // the fresh deadline lapses and fires once more
    status
        .wait_for(|s| s.fire_count == 2)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn task_failure_goes_idle_with_error() {
    let action = action_fn(|_| async { Err(WatchdogError::Action("503 from server".into())) });
    let clock = Arc::new(MonotonicClock::anchored_at(t0()));
    let handle = WatchdogTask::spawn(Watchdog::armed(t0()), action, clock, Duration::from_secs(1));

    let mut status = handle.subscribe();
    let settled = status
        .wait_for(|s| s.fire_count == 1 && s.state == WatchdogState::Idle)
        .await
        .unwrap()
        .clone();
    assert_eq!(
        settled.last_error.as_deref(),
        Some("corrective action failed: 503 from server")
    );
}

#[tokio::test(start_paused = true)]
async fn task_accepts_arm_and_disarm() {
    let calls = Arc::new(AtomicUsize::new(0));
    let action = {
        let calls = Arc::clone(&calls);
        action_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
    };
    let clock = Arc::new(MonotonicClock::anchored_at(t0()));
    let handle = WatchdogTask::spawn(Watchdog::new(), action, clock, Duration::from_secs(1));

    let mut status = handle.subscribe();

    handle.arm(t0() + TimeDelta::seconds(60)).await.unwrap();
    let armed = status
        .wait_for(|s| matches!(s.state, WatchdogState::Armed(_)))
        .await
        .unwrap()
        .state;
    assert_eq!(armed, WatchdogState::Armed(t0() + TimeDelta::seconds(60)));

    handle.disarm().await.unwrap();
    status
        .wait_for(|s| s.state == WatchdogState::Idle)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn task_ends_when_handles_drop() {
    let action = action_fn(|_| async { Ok(None) });
    let clock = Arc::new(MonotonicClock::anchored_at(t0()));
    let handle = WatchdogTask::spawn(Watchdog::new(), action, clock, Duration::from_secs(1));
    let mut status = handle.subscribe();
    let extra = handle.clone();
    drop(handle);

    assert!(extra.arm(t0() + TimeDelta::hours(1)).await.is_ok());
    drop(extra);

    // sender side of the status channel goes away with the task
    tokio::time::timeout(Duration::from_secs(5), async {
        while status.changed().await.is_ok() {}
    })
    .await
    .expect("watchdog task should stop");
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_clone() {
    let action = action_fn(|_| async { Ok(None) });
    let clock = Arc::new(MonotonicClock::anchored_at(t0()));
    let handle = WatchdogTask::spawn(Watchdog::new(), action, clock, Duration::from_secs(1));
    let other = handle.clone();

    handle.shutdown().await;
    assert_eq!(
        other.arm(t0()).await.unwrap_err(),
        WatchdogError::Stopped
    );
}
