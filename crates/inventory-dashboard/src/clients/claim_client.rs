//! # Claim Client
//!
//! The row-facing side of claiming stock. It checks the domain precondition (the item is known
//! and has stock left) against the last successful inventory read, then hands the claim to the
//! [`MutationTracker`](fetcher_framework::MutationTracker).
use super::InventoryClient;
use crate::model::{ClaimRequest, ClaimState, Item, ItemId};
use crate::view::project_stock;
use fetcher_framework::{LoaderClient, MutationError, TrackerClient};
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// Client for starting and observing claims.
#[derive(Clone)]
pub struct ClaimClient {
    tracker: TrackerClient<InventoryClient>,
    loader: LoaderClient<InventoryClient>,
}

impl ClaimClient {
    pub fn new(
        tracker: TrackerClient<InventoryClient>,
        loader: LoaderClient<InventoryClient>,
    ) -> Self {
        Self { tracker, loader }
    }

    /// Starts claiming one unit of `id`. Returns as soon as the claim is in flight.
    ///
    /// # Errors
    /// * [`MutationError::Rejected`] - the item is unknown, or its last known stock is zero
    /// * [`MutationError::AlreadySubmitting`] - a claim for the item is still in flight
    #[instrument(skip(self))]
    pub async fn begin_claim(&self, id: ItemId) -> Result<(), MutationError> {
        let items = self
            .loader
            .last_loaded()
            .await
            .map_err(|_| MutationError::Closed)?
            .unwrap_or_default();
        let item = find(&items, &id)
            .ok_or_else(|| MutationError::Rejected(format!("Unknown item {id}")))?;

        let state = self.tracker.observe(id.clone()).await?;
        if state.is_submitting() {
            return Err(MutationError::AlreadySubmitting(id.to_string()));
        }
        if project_stock(item.stock, &state) == 0 {
            debug!(item_id = %id, "Nothing left to claim");
            return Err(MutationError::Rejected("Out of stock".to_string()));
        }

        self.tracker.begin(ClaimRequest::new(id.clone())).await?;
        info!(item_id = %id, "Claim started");
        Ok(())
    }

    pub async fn observe(&self, id: ItemId) -> Result<ClaimState, MutationError> {
        self.tracker.observe(id).await
    }

    pub async fn subscribe(
        &self,
        id: ItemId,
    ) -> Result<watch::Receiver<ClaimState>, MutationError> {
        self.tracker.subscribe(id).await
    }

    /// Every item with a claim that is not idle.
    pub async fn claims(&self) -> Result<HashMap<ItemId, ClaimState>, MutationError> {
        Ok(self.tracker.snapshot().await?.into_iter().collect())
    }

    /// Waits until the claim on `id` has settled.
    pub async fn wait_settled(&self, id: ItemId) -> Result<ClaimState, MutationError> {
        self.tracker.wait_settled(id).await
    }

    /// Waits until the claim on `id` is back to idle.
    pub async fn wait_idle(&self, id: ItemId) -> Result<ClaimState, MutationError> {
        self.tracker.wait_for(id, |state| state.is_idle()).await
    }

    /// Clears settled claims, as leaving the page would. Claims in flight are kept.
    pub async fn navigate_away(&self) -> Result<usize, MutationError> {
        self.tracker.reset_all().await
    }
}

fn find<'a>(items: &'a [Item], id: &ItemId) -> Option<&'a Item> {
    items.iter().find(|item| &item.id == id)
}
