//! Row projection: one item plus its claim state.

use crate::model::{ClaimState, Item, ItemId};
use fetcher_framework::MutationState;
use serde::Serialize;

/// Stock to display for an item.
///
/// * `Submitting` - one unit less than `authoritative`, clamped at zero.
/// * `Settled(Ok(item))` - the stock the service returned.
/// * otherwise - `authoritative`, which is how a failed claim rolls back.
///
/// Pure: never touches the authoritative value.
pub fn project_stock(authoritative: u32, state: &ClaimState) -> u32 {
    match state {
        MutationState::Submitting(_) => authoritative.saturating_sub(1),
        MutationState::Settled(Ok(item)) => item.stock,
        MutationState::Idle | MutationState::Settled(Err(_)) => authoritative,
    }
}

/// Presentation of one inventory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowModel {
    pub id: ItemId,
    pub name: String,
    pub stock: u32,
    /// Whether the claim control accepts input.
    pub claim_enabled: bool,
    pub pending: bool,
    pub inline_error: Option<String>,
}

impl RowModel {
    pub fn derive(item: &Item, state: &ClaimState) -> Self {
        let stock = project_stock(item.stock, state);
        let pending = state.is_submitting();
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            stock,
            claim_enabled: !pending && stock > 0,
            pending,
            inline_error: state.error().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClaimRequest;

    fn submitting(id: &str) -> ClaimState {
        MutationState::Submitting(ClaimRequest::new(id))
    }

    #[test]
    fn submitting_projects_one_less() {
        assert_eq!(project_stock(3, &submitting("widget")), 2);
    }

    #[test]
    fn projection_never_goes_below_zero() {
        assert_eq!(project_stock(0, &submitting("doohickey")), 0);
    }

    #[test]
    fn projection_is_idempotent() {
        let state = submitting("widget");
        assert_eq!(project_stock(3, &state), project_stock(3, &state));
    }

    #[test]
    fn failed_claim_shows_authoritative_stock_and_error() {
        let item = Item::new("gadget", "Gadget", 1);
        let row = RowModel::derive(&item, &MutationState::Settled(Err("Out of stock".into())));

        assert_eq!(row.stock, 1);
        assert_eq!(row.inline_error.as_deref(), Some("Out of stock"));
        assert!(row.claim_enabled);
    }

    #[test]
    fn settled_ok_uses_returned_item() {
        let item = Item::new("widget", "Widget", 3);
        let row = RowModel::derive(
            &item,
            &MutationState::Settled(Ok(Item::new("widget", "Widget", 2))),
        );
        assert_eq!(row.stock, 2);
        assert!(!row.pending);
    }

    #[test]
    fn claim_disabled_while_submitting_or_empty() {
        let widget = Item::new("widget", "Widget", 3);
        assert!(!RowModel::derive(&widget, &submitting("widget")).claim_enabled);

        let empty = Item::new("doohickey", "Doohickey", 0);
        assert!(!RowModel::derive(&empty, &MutationState::Idle).claim_enabled);
    }
}
