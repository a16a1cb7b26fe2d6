//! Resource synchronization for the critter dashboard.
//!
//! Each collection (creatures, inventory, mailbox, vorest) gets its own
//! [`SyncEngine`] task that:
//! - waits for an access key from the identity stream,
//! - fetches the active [`QuerySpec`](critter_types::QuerySpec) and publishes
//!   a [`ResourceState`] snapshot,
//! - re-polls in the background on a fixed interval,
//! - applies only the most recently dispatched response.
//!
//! Engines are independent: a write that affects several collections must
//! notify each engine itself.
//!
//! # Sources
//!
//! Engines fetch through a [`ResourceSource`]. [`HttpSource`] talks to the
//! game API; [`ClientFilteredSource`] adds local filtering for keys the
//! server does not support; [`source::mock`] has test doubles.

mod config;
mod engine;
mod error;
mod pagination;
mod post_filter;
pub mod source;
mod state;
mod store;

pub use config::SyncConfig;
pub use engine::{EngineStats, Snapshot, SyncEngine, SyncHandle};
pub use error::{SyncError, SyncResult};
pub use pagination::{CursorSink, PageCursor, PaginationCoordinator};
pub use post_filter::{ClientFilteredSource, Predicate};
pub use source::{HttpSource, ResourcePage, ResourceSource};
pub use state::ResourceState;
pub use store::{ResourceStore, Subscription};
