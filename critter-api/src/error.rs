//! API error types.

use serde_json::Value;
use thiserror::Error;

/// Error code the API uses when a session has no linked game account.
pub const NOT_LINKED_CODE: &str = "not_linked";

/// Longest raw (non-JSON) body echoed into an error message.
const MAX_RAW_MESSAGE: usize = 200;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response not covered by a more specific variant.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// 401 / 403.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 409: the record changed underneath the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 400 / 422, or rejected locally before sending.
    #[error("{0}")]
    Validation(String),

    /// The session has no linked game account.
    #[error("account not linked: {0}")]
    NotLinked(String),

    /// A 2xx body that could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Returns true for optimistic-lock conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true for rejected input (empty name, insufficient balance).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Builds the error for a non-2xx response.
    ///
    /// The message is taken from an `error` or `message` string field of a
    /// JSON body, else from a short plain-text body, else a generic text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (message, code) = extract_message(body);
        let message = message.unwrap_or_else(|| format!("request failed with status {status}"));

        if code.as_deref() == Some(NOT_LINKED_CODE) {
            return Self::NotLinked(message);
        }

        match status {
            401 | 403 => Self::Unauthorized(message),
            409 => Self::Conflict(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Status { status, message },
        }
    }

    /// HTTP status, where the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Conflict(_) => Some(409),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

fn extract_message(body: &str) -> (Option<String>, Option<String>) {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let message = ["error", "message"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|m| !m.is_empty())
            .map(str::to_string);
        let code = map.get("code").and_then(Value::as_str).map(str::to_string);
        return (message, code);
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        return (None, None);
    }
    let message: String = trimmed.chars().take(MAX_RAW_MESSAGE).collect();
    (Some(message), None)
}
