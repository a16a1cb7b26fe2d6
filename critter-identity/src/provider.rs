//! Phase 1: session lookup.

use crate::error::{IdentityError, IdentityResult};
use async_trait::async_trait;
use critter_api::{ApiClient, Auth};
use critter_types::{Session, SubjectId};
use serde::Deserialize;
use tracing::debug;

/// Answers "who is signed in".
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> IdentityResult<Session>;
}

/// Reads the session from `GET auth/session` using the upstream bearer token.
#[derive(Debug, Clone)]
pub struct HttpSessionProvider {
    client: ApiClient,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody {
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl HttpSessionProvider {
    pub fn new(client: ApiClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn session(&self) -> IdentityResult<Session> {
        let body: Option<SessionBody> = self
            .client
            .get_json("auth/session", Auth::Bearer(&self.token), &[])
            .await?;

        let body = body.ok_or(IdentityError::NoSession)?;
        match body.subject_id {
            Some(subject) if !subject.is_empty() => {
                debug!("session resolved for subject {}", subject);
                Ok(Session {
                    subject_id: SubjectId::new(subject),
                    email: body.email,
                })
            }
            _ => Err(IdentityError::NoSession),
        }
    }
}

/// Always returns the same session. For offline use and tests.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session: Session,
}

impl StaticSessionProvider {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            session: Session {
                subject_id: SubjectId::new(subject),
                email: None,
            },
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn session(&self) -> IdentityResult<Session> {
        Ok(self.session.clone())
    }
}
