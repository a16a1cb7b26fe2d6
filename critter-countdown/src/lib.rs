//! Deadline countdowns and expiry watchdogs.
//!
//! # Components
//!
//! - **Countdown**: pure function from a deadline, the known total duration
//!   and "now" to remaining time and normalized progress ([`tick`]).
//! - **Ticker**: re-evaluates a countdown once per period for as long as
//!   anyone observes it ([`CountdownTicker`]).
//! - **Watchdog**: fires one corrective action when a deadline lapses and
//!   ignores further expiry signals until that action settles
//!   ([`Watchdog`], [`WatchdogTask`]).
//!
//! Time comes from a [`Clock`], so tests can drive everything with tokio's
//! paused clock.

mod clock;
mod countdown;
mod error;
mod ticker;
mod watchdog;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use countdown::{tick, Countdown, CountdownSnapshot, MAX_PENDING_PROGRESS};
pub use error::{CountdownError, WatchdogError};
pub use ticker::{CountdownTicker, DEFAULT_TICK};
pub use watchdog::{
    action_fn, CorrectiveAction, Fire, Watchdog, WatchdogHandle, WatchdogState, WatchdogStatus,
    WatchdogTask,
};
