//! Error types for the sync layer.

use critter_api::ApiError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The fetch or mutation request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A client-filtered fetch hit its page cap with more pages left.
    #[error("too many results to filter locally (stopped after {cap} pages); narrow the server-side filters")]
    TooManyResults { cap: u32 },

    /// A fetch task panicked before returning a response.
    #[error("fetch task failed: {0}")]
    TaskFailed(String),

    /// The engine has been stopped.
    #[error("sync engine stopped")]
    Stopped,

    /// The engine dropped a reply channel.
    #[error("channel closed")]
    ChannelClosed,
}
