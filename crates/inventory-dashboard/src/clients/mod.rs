//! Type-safe wrappers around the framework clients.

pub mod claim_client;
pub mod inventory_client;

pub use claim_client::*;
pub use inventory_client::*;
