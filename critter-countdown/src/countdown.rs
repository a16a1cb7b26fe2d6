//! Pure countdown arithmetic.

use crate::error::CountdownError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Upper bound on progress while the deadline is still ahead, so that a
/// progress of exactly 100 always means complete.
pub const MAX_PENDING_PROGRESS: f64 = 99.99;

/// One evaluation of a countdown at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownSnapshot {
    /// Time left until the deadline, never negative.
    pub remaining: Duration,
    /// Elapsed share of the total duration, in `[0, 100]`.
    pub progress: f64,
    pub is_complete: bool,
}

impl CountdownSnapshot {
    /// Remaining time as `1d 02:03:04`, or `02:03:04` under a day.
    pub fn remaining_label(&self) -> String {
        let secs = self.remaining.as_secs();
        let (days, rest) = (secs / 86_400, secs % 86_400);
        let (h, m, s) = (rest / 3600, (rest % 3600) / 60, rest % 60);
        if days > 0 {
            format!("{days}d {h:02}:{m:02}:{s:02}")
        } else {
            format!("{h:02}:{m:02}:{s:02}")
        }
    }
}

impl fmt::Display for CountdownSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete {
            write!(f, "done")
        } else {
            write!(f, "{} ({:.1}%)", self.remaining_label(), self.progress)
        }
    }
}

/// Evaluates a countdown towards `deadline` whose full length is `total`.
///
/// Computed at millisecond resolution. The countdown is complete once no
/// whole millisecond remains. A zero `total` reports 0 progress until
/// completion; a deadline further out than `total` clamps to 0.
pub fn tick(deadline: DateTime<Utc>, total: Duration, now: DateTime<Utc>) -> CountdownSnapshot {
    let remaining_ms = (deadline - now).num_milliseconds().max(0) as u64;
    let is_complete = remaining_ms == 0;

    let progress = if is_complete {
        100.0
    } else {
        let total_ms = u64::try_from(total.as_millis()).unwrap_or(u64::MAX);
        if total_ms == 0 {
            0.0
        } else {
            let elapsed_ms = total_ms.saturating_sub(remaining_ms);
            (elapsed_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, MAX_PENDING_PROGRESS)
        }
    };

    CountdownSnapshot {
        remaining: Duration::from_millis(remaining_ms),
        progress,
        is_complete,
    }
}

/// A deadline paired with the length of the activity it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub deadline: DateTime<Utc>,
    pub total: Duration,
}

impl Countdown {
    pub fn new(deadline: DateTime<Utc>, total: Duration) -> Self {
        Self { deadline, total }
    }

    /// Builds a countdown from a server-issued ISO-8601 timestamp.
    pub fn parse(deadline: &str, total: Duration) -> Result<Self, CountdownError> {
        let deadline = DateTime::parse_from_rfc3339(deadline)
            .map_err(|_| CountdownError::InvalidDeadline(deadline.to_string()))?
            .with_timezone(&Utc);
        Ok(Self::new(deadline, total))
    }

    pub fn at(&self, now: DateTime<Utc>) -> CountdownSnapshot {
        tick(self.deadline, self.total, now)
    }
}
