//! Identity resolver: runs both phases and publishes the outcome.

use crate::error::{IdentityError, IdentityResult};
use crate::exchange::{ProfileExchange, ProfileOutcome};
use crate::provider::SessionProvider;
use critter_types::{IdentityState, SubjectId};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

#[derive(Default)]
struct ResolverInner {
    subject: Option<SubjectId>,
    /// Set once phase 1 has failed; nothing resolves after that.
    session_failed: bool,
}

/// Resolves the caller's identity and publishes it as a stream of
/// [`IdentityState`].
///
/// The published state starts as `Pending`. Consumers should subscribe
/// before calling [`resolve`](Self::resolve) or read the current value
/// from the receiver; `watch` always holds the latest state.
pub struct IdentityResolver {
    sessions: Arc<dyn SessionProvider>,
    exchange: Arc<dyn ProfileExchange>,
    state: watch::Sender<IdentityState>,
    inner: Mutex<ResolverInner>,
}

impl IdentityResolver {
    pub fn new(sessions: Arc<dyn SessionProvider>, exchange: Arc<dyn ProfileExchange>) -> Self {
        let (state, _) = watch::channel(IdentityState::Pending);
        Self {
            sessions,
            exchange,
            state,
            inner: Mutex::new(ResolverInner::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> IdentityState {
        self.state.borrow().clone()
    }

    /// Runs phase 1 and, only if it succeeds, phase 2.
    ///
    /// A phase 1 failure is terminal: the state becomes `Failed` and later
    /// calls return it without contacting the provider again.
    pub async fn resolve(&self) -> IdentityState {
        let mut inner = self.inner.lock().await;
        if inner.session_failed {
            return self.state();
        }

        let session = match self.sessions.session().await {
            Ok(session) => session,
            Err(e) => {
                inner.session_failed = true;
                self.publish(IdentityState::Failed {
                    error: e.to_string(),
                });
                return self.state();
            }
        };
        debug!("phase 1 complete for subject {}", session.subject_id);
        inner.subject = Some(session.subject_id.clone());

        let next = match self.exchange.exchange(&session.subject_id).await {
            Ok(outcome) => outcome_state(outcome),
            Err(e) => {
                debug!("phase 2 failed for subject {}", session.subject_id);
                IdentityState::Failed {
                    error: e.to_string(),
                }
            }
        };
        self.publish(next);
        self.state()
    }

    /// Re-runs phase 2 for the already-known subject, e.g. after a mutation
    /// changed balances.
    ///
    /// On error the previously published state is kept and the error is
    /// returned.
    pub async fn refresh_profile(&self) -> IdentityResult<IdentityState> {
        let inner = self.inner.lock().await;
        let subject = inner.subject.clone().ok_or(IdentityError::NotResolved)?;

        let outcome = self.exchange.exchange(&subject).await.map_err(|e| {
            warn!("Profile refresh failed, keeping previous identity: {}", e);
            e
        })?;
        self.publish(outcome_state(outcome));
        Ok(self.state())
    }

    fn publish(&self, next: IdentityState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next.clone();
            true
        });
        if changed {
            match &next {
                IdentityState::Resolved { profile, .. } => {
                    info!("Identity resolved: {}", profile.display_name)
                }
                IdentityState::Unlinked { reason } => info!("Identity unlinked: {}", reason),
                IdentityState::Failed { error } => warn!("Identity failed: {}", error),
                IdentityState::Pending => {}
            }
        }
    }
}

fn outcome_state(outcome: ProfileOutcome) -> IdentityState {
    match outcome {
        ProfileOutcome::Linked {
            access_key,
            profile,
        } => IdentityState::Resolved {
            access_key,
            profile,
        },
        ProfileOutcome::Unlinked { reason } => IdentityState::Unlinked { reason },
    }
}
