//! Core type definitions for the critter dashboard.
//!
//! This crate defines the plain data shared by every other crate:
//! - Identifiers for server-side records (UUID)
//! - [`QuerySpec`], the filters + sort + pagination bundle describing one fetch
//! - [`Pagination`] and [`FetchResponse`], the shape of a collection response
//! - Identity records ([`Session`], [`AccessKey`], [`Profile`], [`IdentityState`])
//! - Resource kinds ([`ResourceKind`]) and their item models
//!
//! Nothing here performs I/O.

mod identity;
mod ids;
mod models;
mod pagination;
mod query;
mod resource;

pub use identity::{AccessKey, IdentityState, Profile, Session, SubjectId};
pub use ids::{CreatureId, ItemId, MailId};
pub use models::{
    Creature, CreatureSummary, InventoryItem, InventorySummary, MailItem, MailSummary,
    VorestCreature, VorestSummary,
};
pub use pagination::{FetchResponse, Pagination};
pub use query::{
    parse_filter, FilterValue, Filters, PageSizeBounds, QuerySpec, SortOrder, SortSpec,
    DEFAULT_PAGE_SIZE,
};
pub use resource::{Creatures, Inventory, Mailbox, ResourceKind, VorestCreatures};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or converting core types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid sort specification: {0}")]
    InvalidSort(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}
