//! Expiry watchdog.
//!
//! [`Watchdog`] is the pure state machine:
//!
//! ```text
//!   Armed(deadline) --deadline passes--> Firing --settle(Ok(Some(next)))--> Armed(next)
//!                                          |
//!                                          +--settle(Ok(None) | Err(_))--> Idle
//! ```
//!
//! While `Firing`, further observations are ignored, so one arming produces
//! at most one corrective action. [`WatchdogTask`] drives the machine from a
//! timer and runs the action.

use crate::clock::Clock;
use crate::countdown::tick;
use crate::error::WatchdogError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Where the watchdog is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Watching for this deadline to pass.
    Armed(DateTime<Utc>),
    /// The corrective action is running.
    Firing,
    /// Nothing to watch.
    Idle,
}

/// Emitted once when an armed deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fire {
    pub deadline: DateTime<Utc>,
}

/// Single-fire expiry state machine.
#[derive(Debug, Clone)]
pub struct Watchdog {
    state: WatchdogState,
    last_error: Option<String>,
    fire_count: u64,
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            state: WatchdogState::Idle,
            last_error: None,
            fire_count: 0,
        }
    }

    pub fn armed(deadline: DateTime<Utc>) -> Self {
        let mut watchdog = Self::new();
        watchdog.arm(deadline);
        watchdog
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// Message of the most recent failed action, cleared by a later success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// Watches a new deadline. Ignored while firing; the settling action
    /// decides what comes next. Returns whether the deadline was taken.
    pub fn arm(&mut self, deadline: DateTime<Utc>) -> bool {
        if self.state == WatchdogState::Firing {
            return false;
        }
        self.state = WatchdogState::Armed(deadline);
        true
    }

    /// Stops watching. A running action still settles normally.
    pub fn disarm(&mut self) {
        if let WatchdogState::Armed(_) = self.state {
            self.state = WatchdogState::Idle;
        }
    }

    /// Checks the armed deadline against `now`. Returns a [`Fire`] exactly
    /// once per arming.
    pub fn observe(&mut self, now: DateTime<Utc>) -> Option<Fire> {
        match self.state {
            WatchdogState::Armed(deadline) if tick(deadline, Duration::ZERO, now).is_complete => {
                self.state = WatchdogState::Firing;
                self.fire_count += 1;
                Some(Fire { deadline })
            }
            _ => None,
        }
    }

    /// Records the outcome of the corrective action.
    ///
    /// `Ok(Some(next))` re-arms with the fresh deadline, `Ok(None)` goes
    /// idle, and `Err` goes idle keeping the message for display.
    pub fn settle(&mut self, outcome: Result<Option<DateTime<Utc>>, String>) {
        if self.state != WatchdogState::Firing {
            return;
        }
        match outcome {
            Ok(Some(next)) => {
                self.last_error = None;
                self.state = WatchdogState::Armed(next);
            }
            Ok(None) => {
                self.last_error = None;
                self.state = WatchdogState::Idle;
            }
            Err(message) => {
                self.last_error = Some(message);
                self.state = WatchdogState::Idle;
            }
        }
    }

    fn status(&self) -> WatchdogStatus {
        WatchdogStatus {
            state: self.state,
            last_error: self.last_error.clone(),
            fire_count: self.fire_count,
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

/// Work performed when a watched deadline passes.
///
/// Returns the next deadline to watch, or `None` to stop watching.
#[async_trait]
pub trait CorrectiveAction: Send + Sync + 'static {
    async fn correct(&self, expired: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, WatchdogError>;
}

/// Adapts an async closure into a [`CorrectiveAction`].
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn CorrectiveAction>
where
    F: Fn(DateTime<Utc>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<DateTime<Utc>>, WatchdogError>> + Send + 'static,
{
    Arc::new(FnAction(f))
}

struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> CorrectiveAction for FnAction<F>
where
    F: Fn(DateTime<Utc>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<DateTime<Utc>>, WatchdogError>> + Send + 'static,
{
    async fn correct(&self, expired: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, WatchdogError> {
        (self.0)(expired).await
    }
}

/// Observable watchdog status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogStatus {
    pub state: WatchdogState,
    pub last_error: Option<String>,
    pub fire_count: u64,
}

enum WatchdogCommand {
    Arm(DateTime<Utc>),
    Disarm,
    Shutdown,
}

/// Timer-driven runner for a [`Watchdog`].
pub struct WatchdogTask;

impl WatchdogTask {
    /// Spawns the watchdog loop, checking the deadline every `period`.
    ///
    /// The corrective action runs on its own task so arm/disarm commands
    /// stay responsive. The loop ends on [`WatchdogHandle::shutdown`] or once
    /// every handle is dropped; an action still running then is aborted.
    pub fn spawn(
        watchdog: Watchdog,
        action: Arc<dyn CorrectiveAction>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> WatchdogHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(watchdog.status());

        let task = tokio::spawn(run(watchdog, action, clock, period, command_rx, status_tx));

        WatchdogHandle {
            commands: command_tx,
            status: status_rx,
            task: Arc::new(task),
        }
    }
}

async fn run(
    mut watchdog: Watchdog,
    action: Arc<dyn CorrectiveAction>,
    clock: Arc<dyn Clock>,
    period: Duration,
    mut commands: mpsc::Receiver<WatchdogCommand>,
    status: watch::Sender<WatchdogStatus>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Option<JoinHandle<Result<Option<DateTime<Utc>>, WatchdogError>>> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(fire) = watchdog.observe(clock.now()) {
                    info!(deadline = %fire.deadline, "deadline passed, running corrective action");
                    let action = Arc::clone(&action);
                    pending = Some(tokio::spawn(async move { action.correct(fire.deadline).await }));
                    status.send_replace(watchdog.status());
                }
            }
            joined = async {
                match pending.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if pending.is_some() => {
                pending = None;
                let outcome = match joined {
                    Ok(Ok(next)) => Ok(next),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("corrective action aborted: {e}")),
                };
                match &outcome {
                    Ok(Some(next)) => debug!(next = %next, "corrective action re-armed watchdog"),
                    Ok(None) => debug!("corrective action finished, watchdog idle"),
                    Err(message) => warn!(error = %message, "corrective action failed"),
                }
                watchdog.settle(outcome);
                status.send_replace(watchdog.status());
            }
            command = commands.recv() => {
                match command {
                    Some(WatchdogCommand::Arm(deadline)) => {
                        if !watchdog.arm(deadline) {
                            debug!(deadline = %deadline, "arm ignored while firing");
                        }
                    }
                    Some(WatchdogCommand::Disarm) => watchdog.disarm(),
                    Some(WatchdogCommand::Shutdown) | None => break,
                }
                status.send_replace(watchdog.status());
            }
        }
    }

    if let Some(handle) = pending {
        handle.abort();
    }
}

/// Handle to a running [`WatchdogTask`].
#[derive(Clone)]
pub struct WatchdogHandle {
    commands: mpsc::Sender<WatchdogCommand>,
    status: watch::Receiver<WatchdogStatus>,
    task: Arc<JoinHandle<()>>,
}

impl WatchdogHandle {
    pub async fn arm(&self, deadline: DateTime<Utc>) -> Result<(), WatchdogError> {
        self.commands
            .send(WatchdogCommand::Arm(deadline))
            .await
            .map_err(|_| WatchdogError::Stopped)
    }

    pub async fn disarm(&self) -> Result<(), WatchdogError> {
        self.commands
            .send(WatchdogCommand::Disarm)
            .await
            .map_err(|_| WatchdogError::Stopped)
    }

    /// Stops the loop for every clone of this handle and waits for it.
    pub async fn shutdown(self) {
        if self.commands.send(WatchdogCommand::Shutdown).await.is_err() {
            return;
        }
        let mut status = self.status;
        while status.changed().await.is_ok() {}
    }

    pub fn status(&self) -> WatchdogStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatchdogStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
