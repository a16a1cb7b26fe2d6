//! Resource kinds: the collections the dashboard keeps in sync.
//!
//! Each kind is a zero-sized marker tying an item type and a summary type
//! to an API path. Sync engines are generic over the marker.

use crate::models::{
    Creature, CreatureSummary, InventoryItem, InventorySummary, MailItem, MailSummary,
    VorestCreature, VorestSummary,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A collection resource served by the game API.
pub trait ResourceKind: Send + Sync + 'static {
    /// One element of the collection.
    type Item: DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    /// Aggregate metadata returned alongside a page.
    type Summary: DeserializeOwned + Clone + Debug + Send + Sync + 'static;

    /// Short name used in logs.
    const NAME: &'static str;
    /// Path of the collection endpoint, relative to the API base URL.
    const PATH: &'static str;
}

/// The home creature roster.
#[derive(Debug, Clone, Copy)]
pub struct Creatures;

impl ResourceKind for Creatures {
    type Item = Creature;
    type Summary = CreatureSummary;
    const NAME: &'static str = "creatures";
    const PATH: &'static str = "creatures";
}

/// The player's item inventory.
#[derive(Debug, Clone, Copy)]
pub struct Inventory;

impl ResourceKind for Inventory {
    type Item = InventoryItem;
    type Summary = InventorySummary;
    const NAME: &'static str = "inventory";
    const PATH: &'static str = "inventory";
}

/// Mailbox messages.
#[derive(Debug, Clone, Copy)]
pub struct Mailbox;

impl ResourceKind for Mailbox {
    type Item = MailItem;
    type Summary = MailSummary;
    const NAME: &'static str = "mailbox";
    const PATH: &'static str = "mailbox";
}

/// Creatures transferred to the Vorest.
#[derive(Debug, Clone, Copy)]
pub struct VorestCreatures;

impl ResourceKind for VorestCreatures {
    type Item = VorestCreature;
    type Summary = VorestSummary;
    const NAME: &'static str = "vorest";
    const PATH: &'static str = "vorest/creatures";
}
