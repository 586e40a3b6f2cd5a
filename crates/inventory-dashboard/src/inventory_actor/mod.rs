//! # Inventory Actor
//!
//! This module implements the simulated inventory service: a
//! [`SourceActor`](fetcher_framework::SourceActor) over [`Item`] records that fails and lags
//! the way a remote service would.
//!
//! ## Structure
//!
//! - [`entity`] - [`SourceEntity`](fetcher_framework::SourceEntity) implementation for [`Item`]
//! - [`error`] - [`InventoryError`] type for type-safe error handling
//! - [`actions`] - [`InventoryAction`] for claiming stock
//! - [`new()`] - Factory function that creates the actor and client from a config
//!
//! ## Usage
//!
//! ```rust
//! use inventory_dashboard::inventory_actor;
//! use inventory_dashboard::clients::InventoryClient;
//! use inventory_dashboard::config::DashboardConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (actor, generic_client) = inventory_actor::new(&DashboardConfig::reliable());
//!     let client = InventoryClient::new(generic_client);
//!
//!     // Start the actor (no dependencies)
//!     tokio::spawn(actor.run(()));
//!
//!     let items = client.fetch_inventory().await?;
//!     let widget = client.claim_stock(items[0].id.clone()).await?;
//!     assert_eq!(widget.stock, items[0].stock - 1);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;

use crate::config::DashboardConfig;
use crate::model::Item;
use fetcher_framework::{RandomFaults, SourceActor, SourceClient};

/// Records the simulated service starts with.
pub fn seed_items() -> Vec<Item> {
    vec![
        Item::new("widget", "Widget", 3),
        Item::new("gadget", "Gadget", 1),
        Item::new("doohickey", "Doohickey", 0),
        Item::new("sprocket", "Sprocket", 12),
    ]
}

/// Creates a new Inventory actor and its client.
///
/// Faults are drawn at the configured rates; latency follows the config.
pub fn new(config: &DashboardConfig) -> (SourceActor<Item>, SourceClient<Item>) {
    let (actor, client) = SourceActor::new(config.buffer_size, seed_items());
    let actor = actor
        .with_faults(RandomFaults::new(
            config.fetch_failure_rate,
            config.claim_failure_rate,
            config.seed,
        ))
        .with_latency(config.latency());
    (actor, client)
}
