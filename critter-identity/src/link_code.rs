//! Link codes for attaching a game account to a login.

use crate::error::IdentityResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use critter_api::{ApiClient, Auth, Method};
use critter_countdown::{CorrectiveAction, WatchdogError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Lifetime the server gives each link code.
pub const LINK_CODE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Requests link codes and renews them on expiry.
///
/// Used as the corrective action of a deadline watchdog armed on the
/// current code's `expires_at`.
pub struct LinkCodeRefresher {
    client: ApiClient,
    token: String,
    current: watch::Sender<Option<LinkCode>>,
}

impl LinkCodeRefresher {
    pub fn new(client: ApiClient, token: impl Into<String>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            client,
            token: token.into(),
            current,
        }
    }

    /// `POST link/code`; the new code becomes [`current`](Self::current).
    pub async fn request(&self) -> IdentityResult<LinkCode> {
        let code: LinkCode = self
            .client
            .send_json(Method::POST, "link/code", Auth::Bearer(&self.token), &json!({}))
            .await?;
        info!("New link code issued, expires at {}", code.expires_at);
        self.current.send_replace(Some(code.clone()));
        Ok(code)
    }

    pub fn current(&self) -> Option<LinkCode> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LinkCode>> {
        self.current.subscribe()
    }
}

#[async_trait]
impl CorrectiveAction for LinkCodeRefresher {
    async fn correct(&self, expired: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, WatchdogError> {
        info!("Link code expired at {}, requesting a new one", expired);
        let code = self
            .request()
            .await
            .map_err(|e| WatchdogError::Action(e.to_string()))?;
        Ok(Some(code.expires_at))
    }
}
