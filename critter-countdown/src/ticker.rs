//! Periodic countdown re-evaluation.

use crate::clock::Clock;
use crate::countdown::{Countdown, CountdownSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// Display cadence for countdowns.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Background task publishing a [`CountdownSnapshot`] every period.
///
/// The task ends on its own once the countdown completes or once every
/// receiver has been dropped.
#[derive(Debug)]
pub struct CountdownTicker {
    task: JoinHandle<()>,
}

impl CountdownTicker {
    /// Starts ticking. The returned receiver already holds the snapshot for
    /// the current instant.
    pub fn spawn(
        countdown: Countdown,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> (Self, watch::Receiver<CountdownSnapshot>) {
        let (tx, rx) = watch::channel(countdown.at(clock.now()));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let snapshot = countdown.at(clock.now());
                        if tx.send(snapshot).is_err() {
                            break;
                        }
                        if snapshot.is_complete {
                            trace!(deadline = %countdown.deadline, "countdown complete");
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });

        (Self { task }, rx)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the ticker to end.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}
