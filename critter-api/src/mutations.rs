//! Write endpoints.
//!
//! Each mutation is an independent request/response pair. Callers are
//! expected to hand the result to the owning sync engine
//! (`SyncHandle::settle_mutation`) so the affected collection is re-fetched,
//! and to refresh the identity profile when balances change.

use crate::client::{ApiClient, Auth};
use crate::error::{ApiError, ApiResult};
use critter_types::{AccessKey, Creature, CreatureId, ItemId, MailId, VorestCreature};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Longest creature name the game accepts.
pub const MAX_NAME_LEN: usize = 32;

/// Rewards granted by claiming a mailbox message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    #[serde(default)]
    pub points_awarded: i64,
    #[serde(default)]
    pub coins_awarded: i64,
}

/// Balance after a shop purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub item_id: ItemId,
    pub quantity: u32,
    pub coins_remaining: i64,
}

/// Write operations against the game API.
#[derive(Debug, Clone)]
pub struct Mutations {
    client: ApiClient,
}

impl Mutations {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Claims the reward attached to a mailbox message.
    pub async fn claim_mail(&self, key: &AccessKey, mail: MailId) -> ApiResult<ClaimReceipt> {
        let receipt: ClaimReceipt = self
            .client
            .send_json(
                Method::POST,
                &format!("mailbox/{mail}/claim"),
                Auth::AccessKey(key),
                &json!({}),
            )
            .await?;
        info!("Claimed mail {}: +{} points", mail, receipt.points_awarded);
        Ok(receipt)
    }

    /// Cancels a running breeding session.
    pub async fn cancel_breeding(&self, key: &AccessKey, creature: CreatureId) -> ApiResult<()> {
        self.client
            .send_no_content(
                Method::POST,
                &format!("creatures/{creature}/breeding/cancel"),
                Auth::AccessKey(key),
                &json!({}),
            )
            .await
    }

    /// Renames a creature. Empty or over-long names are rejected locally
    /// without a request.
    pub async fn rename_creature(
        &self,
        key: &AccessKey,
        creature: CreatureId,
        name: &str,
    ) -> ApiResult<Creature> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        self.client
            .send_json(
                Method::PATCH,
                &format!("creatures/{creature}"),
                Auth::AccessKey(key),
                &json!({ "name": name }),
            )
            .await
    }

    /// Buys `quantity` units of a shop item.
    pub async fn purchase(
        &self,
        key: &AccessKey,
        item: ItemId,
        quantity: u32,
    ) -> ApiResult<PurchaseReceipt> {
        if quantity == 0 {
            return Err(ApiError::Validation("quantity must be at least 1".into()));
        }
        self.client
            .send_json(
                Method::POST,
                "shop/purchase",
                Auth::AccessKey(key),
                &json!({ "itemId": item, "quantity": quantity }),
            )
            .await
    }

    /// Consumes an inventory booster on a creature.
    pub async fn apply_booster(
        &self,
        key: &AccessKey,
        creature: CreatureId,
        item: ItemId,
    ) -> ApiResult<()> {
        self.client
            .send_no_content(
                Method::POST,
                &format!("creatures/{creature}/boosters"),
                Auth::AccessKey(key),
                &json!({ "itemId": item }),
            )
            .await
    }

    /// Moves a creature from the home roster to the Vorest.
    pub async fn transfer_to_vorest(
        &self,
        key: &AccessKey,
        creature: CreatureId,
    ) -> ApiResult<VorestCreature> {
        self.client
            .send_json(
                Method::POST,
                "vorest/transfers",
                Auth::AccessKey(key),
                &json!({ "creatureId": creature }),
            )
            .await
    }
}
