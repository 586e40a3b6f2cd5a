//! SourceEntity trait implementation for the Item domain type.
//!
//! See the trait implementation on [`Item`] for method documentation.

use super::actions::InventoryAction;
use super::error::InventoryError;
use crate::model::{Item, ItemId};
use async_trait::async_trait;
use fetcher_framework::SourceEntity;
use tracing::debug;

#[async_trait]
impl SourceEntity for Item {
    type Id = ItemId;
    type Action = InventoryAction;
    type ActionResult = Item;
    type Context = ();
    type Error = InventoryError;

    fn id(&self) -> ItemId {
        self.id.clone()
    }

    /// Handles custom actions for the Item entity.
    ///
    /// # Actions
    /// - `Claim`: Decrements stock by one and returns the updated item
    async fn handle_action(
        &mut self,
        action: InventoryAction,
        _ctx: &Self::Context,
    ) -> Result<Item, Self::Error> {
        match action {
            InventoryAction::Claim => {
                if self.stock == 0 {
                    return Err(InventoryError::OutOfStock);
                }
                self.stock -= 1;
                debug!(item_id = %self.id, stock = self.stock, "Claimed one unit");
                Ok(self.clone())
            }
        }
    }
}
