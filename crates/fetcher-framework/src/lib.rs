//! # Fetcher Framework
//!
//! This crate provides the building blocks for a data-driven page that stays usable while the
//! network does not: reads that fail, mutations that take a second, and rendering code that
//! may be wrong. Every component is a Tokio actor (a task owning its state, a channel in, and
//! a cloneable client out), so state is never shared and never locked.
//!
//! ## Why Actors?
//!
//! - Isolated state (no shared memory, no locks)
//! - Message-passing concurrency
//! - Sequential processing within each actor, so state transitions never race
//!
//! **Further Reading**:
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! 1. **Source** ([`SourceActor`] / [`SourceClient`]) - the authoritative records, with
//!    optional [fault injection](fault) and latency to stand in for a remote service.
//! 2. **Loader** ([`LoaderController`] / [`LoaderClient`]) - one read's lifecycle as a
//!    [`FetchPhase`], retried only when the user asks.
//! 3. **Tracker** ([`MutationTracker`] / [`TrackerClient`]) - at most one in-flight mutation
//!    per key, published through a [`KeyedStore`] so every view derives the same optimistic
//!    projection.
//! 4. **Boundaries** ([`scoped_region`], [`page_boundary`]) - where failures are rendered.
//!
//! ```text
//!   TrackerClient ──begin──▶ MutationTracker ──commit──▶ Mutator ──action──▶ SourceActor
//!                                  │                                              ▲
//!                                  └──revalidate──▶ LoaderController ──fetch──────┘
//! ```
//!
//! The dependency graph is acyclic: the tracker knows the loader only through the
//! [`Revalidate`] hook, and the loader knows the source only through its [`Fetcher`].
//!
//! ## Context Injection Pattern
//!
//! Dependencies are injected at **runtime** via `run()`, not at construction time. Actors are
//! created first, clients are handed around, and only then are the actors started:
//!
//! ```rust
//! use fetcher_framework::{
//!     FetchError, FetchPhase, Fetcher, LoaderController, MutationTracker, Mutator,
//!     TrackerContext,
//! };
//! use async_trait::async_trait;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Clone)]
//! struct Likes(Arc<AtomicU32>);
//!
//! #[async_trait]
//! impl Fetcher for Likes {
//!     type Output = u32;
//!     async fn fetch(&self) -> Result<u32, FetchError> {
//!         Ok(self.0.load(Ordering::SeqCst))
//!     }
//! }
//!
//! #[async_trait]
//! impl Mutator for Likes {
//!     type Key = &'static str;
//!     type Request = &'static str;
//!     type Output = u32;
//!     fn key(request: &&'static str) -> &'static str { *request }
//!     async fn commit(&self, _: &'static str) -> Result<u32, String> {
//!         Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let likes = Likes(Arc::new(AtomicU32::new(0)));
//!
//!     // 1. Create the actors (no dependencies yet)
//!     let (loader, loader_client) = LoaderController::<Likes>::new(8);
//!     let (tracker, tracker_client) = MutationTracker::<Likes>::new(8);
//!
//!     // 2. Wire dependencies when starting them
//!     tokio::spawn(loader.run(likes.clone()));
//!     let context = TrackerContext::new(likes).with_revalidator(loader_client.clone());
//!     tokio::spawn(tracker.run(context));
//!
//!     // 3. Use them
//!     assert_eq!(loader_client.load().await.unwrap(), FetchPhase::Loaded(0));
//!     tracker_client.begin("post").await.unwrap();
//!     tracker_client.wait_for("post", |s| s.is_idle()).await.unwrap();
//!     assert_eq!(loader_client.current_phase().await.unwrap(), FetchPhase::Loaded(1));
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Each actor runs in its own Tokio task and processes messages **sequentially**
//! - Slow work (commits, fetches, delayed replies) runs on spawned tasks whose outcome is fed
//!   back into the owning loop
//! - Mutations on different keys overlap; a second mutation on a busy key is rejected
//!
//! ## Testing
//!
//! The [`mock`] module provides a `MockClient` that answers a [`SourceClient`] from queued
//! expectations, and [`fault::ScriptedFaults`] makes a real [`SourceActor`] fail on cue.

pub mod actor;
pub mod boundary;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod fault;
pub mod loader;
pub mod message;
pub mod mock;
pub mod store;
pub mod tracker;

// Re-export core types for convenience
pub use actor::SourceActor;
pub use boundary::{
    page_boundary, scoped_region, Chrome, Freshness, Page, RecoveryView, Region, RetryTrigger,
    ScopedFailure,
};
pub use client::SourceClient;
pub use client_trait::ActorClient;
pub use entity::SourceEntity;
pub use error::{FetchError, FrameworkError, MutationError, RenderError};
pub use fault::{FaultInjector, Latency, NoFaults, RandomFaults, ScriptedFaults};
pub use loader::{FetchPhase, Fetcher, LoaderClient, LoaderController};
pub use message::{Response, SourceOp, SourceRequest};
pub use store::KeyedStore;
pub use tracker::{
    MutationState, MutationTracker, Mutator, Revalidate, StateOf, TrackerClient, TrackerContext,
};
