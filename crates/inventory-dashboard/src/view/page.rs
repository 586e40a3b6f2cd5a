//! The dashboard page: chrome, plus a table region that may fail on its own.

use super::row::RowModel;
use crate::model::{ClaimState, Item, ItemId};
use fetcher_framework::{
    page_boundary, scoped_region, Chrome, FetchPhase, Freshness, Page, RenderError,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const DASHBOARD_TITLE: &str = "Inventory";

/// Content of the table region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryTable {
    pub rows: Vec<RowModel>,
    /// A reload is in flight; rows come from the previous read.
    pub refreshing: bool,
}

impl InventoryTable {
    /// Builds one row per item. Items without a claim entry are idle.
    ///
    /// Two items sharing an id are a defect in the data, not a fetch failure.
    pub fn build(
        items: &[Item],
        freshness: Freshness,
        claims: &HashMap<ItemId, ClaimState>,
    ) -> Result<Self, RenderError> {
        let idle = ClaimState::default();
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(&item.id) {
                return Err(RenderError::Defect(format!("Duplicate item id {}", item.id)));
            }
            let state = claims.get(&item.id).unwrap_or(&idle);
            rows.push(RowModel::derive(item, state));
        }
        Ok(Self {
            rows,
            refreshing: freshness == Freshness::Refreshing,
        })
    }

    pub fn row(&self, id: &ItemId) -> Option<&RowModel> {
        self.rows.iter().find(|row| &row.id == id)
    }
}

/// Renders the whole dashboard.
///
/// A failed read stays inside the table region with a revalidate trigger; anything that goes
/// wrong while building the table replaces the page with a recovery view.
pub fn render_dashboard(
    phase: &FetchPhase<Vec<Item>>,
    last_loaded: Option<&Vec<Item>>,
    claims: &HashMap<ItemId, ClaimState>,
) -> Page<InventoryTable> {
    page_boundary(Chrome::new(DASHBOARD_TITLE), || {
        scoped_region(phase, last_loaded, |items: &Vec<Item>, freshness| {
            InventoryTable::build(items, freshness, claims)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClaimRequest;
    use fetcher_framework::{MutationState, Region, RetryTrigger};

    fn items() -> Vec<Item> {
        vec![
            Item::new("widget", "Widget", 3),
            Item::new("gadget", "Gadget", 1),
        ]
    }

    #[test]
    fn loaded_inventory_renders_rows_inside_chrome() {
        let mut claims = HashMap::new();
        claims.insert(
            ItemId::from("widget"),
            MutationState::Submitting(ClaimRequest::new("widget")),
        );

        let page = render_dashboard(&FetchPhase::Loaded(items()), None, &claims);

        assert_eq!(page.chrome().unwrap().title, DASHBOARD_TITLE);
        let table = page.body().unwrap().content().unwrap();
        assert_eq!(table.row(&"widget".into()).unwrap().stock, 2);
        assert_eq!(table.row(&"gadget".into()).unwrap().stock, 1);
        assert!(!table.refreshing);
    }

    #[test]
    fn failed_load_keeps_chrome_and_offers_revalidate() {
        let page = render_dashboard(
            &FetchPhase::Failed("Could not load inventory".into()),
            None,
            &HashMap::new(),
        );

        assert_eq!(page.chrome().unwrap().title, DASHBOARD_TITLE);
        let failure = page.body().unwrap().failure().unwrap();
        assert_eq!(failure.retry, RetryTrigger::Revalidate);
    }

    #[test]
    fn duplicate_ids_escalate_to_the_page_boundary() {
        let mut duplicated = items();
        duplicated.push(Item::new("widget", "Widget again", 9));

        let page = render_dashboard(&FetchPhase::Loaded(duplicated), None, &HashMap::new());

        let recovery = page.recovery().unwrap();
        assert_eq!(recovery.retry, RetryTrigger::Reload);
        assert!(recovery.message.contains("Duplicate item id widget"));
    }

    #[test]
    fn reload_keeps_previous_rows_visible() {
        let previous = items();
        let page = render_dashboard(&FetchPhase::Loading, Some(&previous), &HashMap::new());

        let table = page.body().unwrap().content().unwrap();
        assert!(table.refreshing);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn first_load_is_pending() {
        let page = render_dashboard(&FetchPhase::Loading, None, &HashMap::new());
        assert_eq!(page.body(), Some(&Region::Pending));
    }
}
