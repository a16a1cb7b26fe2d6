//! Item and summary models for each collection resource.
//!
//! Field names follow the game API's camelCase JSON.

use crate::ids::{CreatureId, ItemId, MailId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A creature on the home roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub species: String,
    pub is_alive: bool,
    #[serde(default)]
    pub level: u32,
    /// End of the current breeding session, if one is running.
    #[serde(default)]
    pub breeding_ends_at: Option<DateTime<Utc>>,
}

impl Creature {
    /// True while a breeding session is still running at `now`.
    ///
    /// Derived on the client; the API cannot filter on it.
    pub fn is_breeding(&self, now: DateTime<Utc>) -> bool {
        self.breeding_ends_at.is_some_and(|ends| ends > now)
    }
}

/// Aggregate counts for the creature roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatureSummary {
    pub total: u64,
    pub alive: u64,
    pub deceased: u64,
}

/// A stack of one item type in the player's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: ItemId,
    pub item_type: String,
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_items: u64,
    pub distinct_types: u64,
}

/// A mailbox message, possibly carrying a claimable reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailItem {
    pub id: MailId,
    pub subject: String,
    #[serde(default)]
    pub sender: Option<String>,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub has_reward: bool,
    #[serde(default)]
    pub is_claimed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSummary {
    pub unread: u64,
    pub unclaimed: u64,
}

/// A creature living in the Vorest, the alternate location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VorestCreature {
    pub id: CreatureId,
    pub name: String,
    pub species: String,
    pub is_alive: bool,
    pub arrived_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VorestSummary {
    pub total: u64,
    pub alive: u64,
}
