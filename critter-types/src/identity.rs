//! Identity records produced by the two-phase identity resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session subject returned by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque key required by every resource fetch.
///
/// `Debug` is redacted so keys do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the key carries no characters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(..)")
    }
}

/// Phase 1 result: who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Phase 2 profile attributes (balances, display name, status).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Resolution state of the caller's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    /// Resolution has not finished yet.
    Pending,
    /// Both phases succeeded.
    Resolved {
        access_key: AccessKey,
        profile: Profile,
    },
    /// The session exists but has no linked game account.
    /// The remedy is a user action elsewhere, not a retry.
    Unlinked { reason: String },
    /// Resolution failed.
    Failed { error: String },
}

impl IdentityState {
    /// Returns the access key if resolved with a non-empty key.
    pub fn access_key(&self) -> Option<&AccessKey> {
        match self {
            Self::Resolved { access_key, .. } if !access_key.is_empty() => Some(access_key),
            _ => None,
        }
    }

    /// Returns the profile if resolved.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Resolved { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// True once resolution has reached an outcome that will not produce an
    /// access key on its own (unlinked or failed).
    pub fn is_dead_end(&self) -> bool {
        matches!(self, Self::Unlinked { .. } | Self::Failed { .. })
    }
}
