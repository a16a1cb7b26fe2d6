use thiserror::Error;

/// Errors building a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("invalid deadline '{0}': expected an ISO-8601 timestamp")]
    InvalidDeadline(String),
}

/// Errors from a watchdog's corrective action or its task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// The corrective action ran and failed.
    #[error("corrective action failed: {0}")]
    Action(String),

    /// The watchdog task is no longer running.
    #[error("watchdog stopped")]
    Stopped,
}
