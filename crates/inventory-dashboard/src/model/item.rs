//! Items of the inventory and the payload of a claim.
//!
//! [`Item`] implements the [`SourceEntity`](fetcher_framework::SourceEntity) trait, allowing it
//! to be served by a [`SourceActor`](fetcher_framework::SourceActor). See
//! [`impl SourceEntity for Item`](Item#impl-SourceEntity-for-Item) for the claim action
//! ([`InventoryAction`](crate::inventory_actor::InventoryAction)).

use fetcher_framework::MutationState;
use serde::{Deserialize, Serialize};

use std::fmt::Display;

/// Type-safe identifier for Items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents an item in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub stock: u32,
}

impl Item {
    /// Creates a new Item instance.
    ///
    /// # Arguments
    /// * `id` - Unique identifier
    /// * `name` - Display name
    /// * `stock` - Units available to claim
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock,
        }
    }
}

/// Payload of one in-flight claim of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub item_id: ItemId,
}

impl ClaimRequest {
    pub fn new(item_id: impl Into<ItemId>) -> Self {
        Self {
            item_id: item_id.into(),
        }
    }
}

/// Per-item claim state, as published by the mutation tracker.
pub type ClaimState = MutationState<ClaimRequest, Item>;
