//! Error types for identity resolution.

use critter_api::ApiError;
use thiserror::Error;

/// Result type alias for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors that can occur while resolving identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no active session")]
    NoSession,

    #[error("identity has not been resolved")]
    NotResolved,
}
