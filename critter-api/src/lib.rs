//! HTTP client for the critter game API.
//!
//! Everything that talks to the remote API goes through [`ApiClient`]:
//! collection fetches (via the sync engine's HTTP source), identity
//! resolution and the write endpoints in [`Mutations`].
//!
//! Non-2xx responses become an [`ApiError`] carrying a human-readable
//! message pulled from the response body when one is present.

mod client;
mod config;
mod error;
mod mutations;

pub use client::{ApiClient, Auth};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, NOT_LINKED_CODE};
pub use mutations::{ClaimReceipt, Mutations, PurchaseReceipt, MAX_NAME_LEN};
pub use reqwest::Method;
