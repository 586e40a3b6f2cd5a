//! # SourceEntity Trait
//!
//! The `SourceEntity` trait is the contract every record held by a
//! [`SourceActor`](crate::SourceActor) must satisfy. The actor lists, reads, and mutates records; the record itself decides what a
//! mutation means through [`SourceEntity::handle_action`].
//!
//! # Architecture Note
//! The source is the *single source of truth* for the dashboard. Views never write to it
//! directly: they read it through a loader and change it through resource-specific actions
//! (e.g. claiming one unit of stock). Associated types keep each source strongly typed, so an
//! inventory action can never be sent to a different kind of record.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be served by a `SourceActor`.
///
/// # Async & Context
/// This trait is `#[async_trait]` so action handlers may await other services. The `Context`
/// type is injected into every handler by [`SourceActor::run`](crate::SourceActor::run), which
/// allows late binding of dependencies.
#[async_trait]
pub trait SourceEntity: Clone + Send + Sync + 'static {
    /// The unique identifier of a record (e.g. `ItemId`).
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// Enum of record-specific operations (e.g. `Claim`).
    type Action: Send + Sync + Debug + 'static;

    /// The value returned by a successful action.
    type ActionResult: Send + Sync + Debug + 'static;

    /// The runtime context injected into the actor. Use `()` if nothing is needed.
    type Context: Send + Sync;

    /// The error type for this record.
    ///
    /// One enum per record type rather than one per action keeps client error handling to a
    /// single `match`.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The record's identifier. Used to key the store when seeding.
    fn id(&self) -> Self::Id;

    /// Handle a record-specific action.
    ///
    /// An `Err` must leave the record unchanged.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
