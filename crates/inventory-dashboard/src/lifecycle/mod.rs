//! # Session Lifecycle & Orchestration
//!
//! Starts, wires and stops the actors behind one dashboard session.
//!
//! ## Dependency Injection via Context
//!
//! Every actor is created first and receives its dependencies in `run()`:
//!
//! ```rust,ignore
//! let (actor, source) = inventory_actor::new(&config);
//! let inventory_client = InventoryClient::new(source);
//! let (loader, loader_client) = LoaderController::new(config.buffer_size);
//! let (tracker, tracker_client) = MutationTracker::new(config.buffer_size);
//!
//! tokio::spawn(actor.run(()));
//! tokio::spawn(loader.run(inventory_client.clone()));
//! tokio::spawn(tracker.run(
//!     TrackerContext::new(inventory_client).with_revalidator(loader_client.clone()),
//! ));
//! ```
//!
//! The wiring is acyclic (tracker → loader → source), so dropping the clients is enough to
//! stop everything: each actor exits when its own channel closes, and its context drops the
//! clients it held.
//!
//! ## Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging for the entire system. See
//! the [`tracing`](self::tracing) module for what gets logged.

pub mod dashboard_system;
pub mod tracing;

pub use self::tracing::*;
pub use dashboard_system::*;
