//! Phase 2: subject-to-profile exchange.

use crate::error::IdentityResult;
use async_trait::async_trait;
use critter_api::{ApiClient, ApiError, Auth, Method};
use critter_types::{AccessKey, Profile, SubjectId};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// What the profile exchange found for a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Linked { access_key: AccessKey, profile: Profile },
    /// The subject has no game account linked yet.
    Unlinked { reason: String },
}

/// Trades a session subject for a game profile.
#[async_trait]
pub trait ProfileExchange: Send + Sync {
    async fn exchange(&self, subject: &SubjectId) -> IdentityResult<ProfileOutcome>;
}

const DEFAULT_UNLINKED_REASON: &str = "no game account is linked to this login";

/// `POST users/resolve` with `{ "subjectId": ... }`.
///
/// A 2xx body without an `accessKey` and an error body with code
/// `not_linked` both mean the account is unlinked.
#[derive(Debug, Clone)]
pub struct HttpProfileExchange {
    client: ApiClient,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveBody {
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(flatten)]
    profile: Profile,
}

impl HttpProfileExchange {
    pub fn new(client: ApiClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }
}

#[async_trait]
impl ProfileExchange for HttpProfileExchange {
    async fn exchange(&self, subject: &SubjectId) -> IdentityResult<ProfileOutcome> {
        let result: Result<ResolveBody, ApiError> = self
            .client
            .send_json(
                Method::POST,
                "users/resolve",
                Auth::Bearer(&self.token),
                &json!({ "subjectId": subject.as_str() }),
            )
            .await;

        match result {
            Ok(ResolveBody {
                access_key: Some(key),
                profile,
                ..
            }) if !key.is_empty() => {
                debug!("profile resolved for subject {}", subject);
                Ok(ProfileOutcome::Linked {
                    access_key: AccessKey::new(key),
                    profile,
                })
            }
            Ok(body) => Ok(ProfileOutcome::Unlinked {
                reason: body
                    .reason
                    .unwrap_or_else(|| DEFAULT_UNLINKED_REASON.to_string()),
            }),
            Err(ApiError::NotLinked(reason)) => Ok(ProfileOutcome::Unlinked { reason }),
            Err(e) => Err(e.into()),
        }
    }
}
