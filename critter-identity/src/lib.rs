//! Identity resolution for the critter dashboard.
//!
//! Resolution runs in two phases:
//!
//! 1. **Session** ([`SessionProvider`]): ask the upstream identity provider
//!    who the signed-in user is.
//! 2. **Profile exchange** ([`ProfileExchange`]): trade that subject for the
//!    game profile and the access key every resource fetch needs.
//!
//! [`IdentityResolver`] publishes the outcome as a `watch` stream of
//! [`IdentityState`](critter_types::IdentityState), which sync engines
//! consume to gate their fetches.
//!
//! [`LinkCodeRefresher`] issues the short-lived code an unlinked user types
//! into the game client, and renews it when a watchdog sees it expire.

mod error;
mod exchange;
mod link_code;
mod provider;
mod resolver;

pub use error::{IdentityError, IdentityResult};
pub use exchange::{HttpProfileExchange, ProfileExchange, ProfileOutcome};
pub use link_code::{LinkCode, LinkCodeRefresher, LINK_CODE_TTL};
pub use provider::{HttpSessionProvider, SessionProvider, StaticSessionProvider};
pub use resolver::IdentityResolver;
