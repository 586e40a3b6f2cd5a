//! Custom actions for the Inventory actor.
//!
//! These actions are handled by
//! [`SourceEntity::handle_action`](fetcher_framework::SourceEntity::handle_action).
//! See [`impl SourceEntity for Item`](crate::model::Item#impl-SourceEntity-for-Item) for the
//! implementation details.

/// Custom actions for Item entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    /// Takes one unit of stock.
    ///
    /// # Errors
    /// Fails with [`InventoryError::OutOfStock`](super::InventoryError::OutOfStock) when the
    /// stock is already zero.
    Claim,
}
