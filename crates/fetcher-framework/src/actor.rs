//! # Source Actor
//!
//! This module defines the `SourceActor`, the stand-in for a remote data service. It owns the
//! authoritative records and processes requests sequentially, so the store needs no locks.

use crate::client::SourceClient;
use crate::entity::SourceEntity;
use crate::error::FrameworkError;
use crate::fault::{FaultInjector, Latency, NoFaults};
use crate::message::{Response, SourceRequest};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The actor that serves a collection of records.
///
/// # Architecture Note
/// This struct is the "Server" half of the source. It owns the records and the receiver end of
/// the channel; [`SourceClient`] is the cloneable "Client" half.
///
/// **Concurrency Model**:
/// Requests are processed one at a time, so every read observes every earlier write. Replies,
/// however, are handed to a spawned task when a [`Latency`] is configured: a slow answer to one
/// claim never holds up a claim on another record.
///
/// # Usage Pattern
///
/// 1.  **Create**: `SourceActor::new(buffer, records)` returns the actor and its client.
/// 2.  **Configure**: optionally attach a [`FaultInjector`] and a [`Latency`].
/// 3.  **Run**: spawn `actor.run(context)`.
///
/// ```rust
/// use fetcher_framework::{SourceActor, SourceEntity};
/// use async_trait::async_trait;
///
/// #[derive(Clone, Debug)] struct Counter { id: u32, value: u32 }
/// #[derive(Debug)] enum CounterAction { Bump }
/// #[derive(Debug, thiserror::Error)] #[error("counter error")] struct CounterError;
///
/// #[async_trait]
/// impl SourceEntity for Counter {
///     type Id = u32;
///     type Action = CounterAction;
///     type ActionResult = u32;
///     type Context = ();
///     type Error = CounterError;
///
///     fn id(&self) -> u32 { self.id }
///     async fn handle_action(&mut self, _: CounterAction, _: &()) -> Result<u32, CounterError> {
///         self.value += 1;
///         Ok(self.value)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = SourceActor::new(10, vec![Counter { id: 1, value: 0 }]);
///     tokio::spawn(actor.run(()));
///
///     assert_eq!(client.perform_action(1, CounterAction::Bump).await.unwrap(), 1);
///     assert_eq!(client.list().await.unwrap().len(), 1);
/// }
/// ```
pub struct SourceActor<T: SourceEntity> {
    receiver: mpsc::Receiver<SourceRequest<T>>,
    store: HashMap<T::Id, T>,
    order: Vec<T::Id>,
    faults: Box<dyn FaultInjector>,
    latency: Latency,
}

impl<T: SourceEntity> SourceActor<T> {
    /// Creates a new `SourceActor` seeded with `records`, and its client.
    ///
    /// Listing returns records in seed order. A later record with a duplicate id replaces the
    /// earlier one in place.
    ///
    /// # Arguments
    ///
    /// * `buffer_size` - The capacity of the MPSC channel. If the channel is full,
    ///   calls to the client wait until there is space.
    /// * `records` - The initial records.
    pub fn new(
        buffer_size: usize,
        records: impl IntoIterator<Item = T>,
    ) -> (Self, SourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let mut store = HashMap::new();
        let mut order = Vec::new();
        for record in records {
            let id = record.id();
            if store.insert(id.clone(), record).is_none() {
                order.push(id);
            }
        }
        let actor = Self {
            receiver,
            store,
            order,
            faults: Box::new(NoFaults),
            latency: Latency::default(),
        };
        (actor, SourceClient::new(sender))
    }

    /// Replaces the fault policy.
    pub fn with_faults(mut self, faults: impl FaultInjector) -> Self {
        self.faults = Box::new(faults);
        self
    }

    /// Replaces the reply latency.
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Runs the actor's event loop, processing messages until the channel closes.
    ///
    /// # Context Injection
    /// The `context` argument is passed to every [`SourceEntity::handle_action`] call.
    pub async fn run(mut self, context: T::Context) {
        // Just the type name, e.g. "Item" rather than "inventory_dashboard::model::item::Item"
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, size = self.store.len(), "Source started");

        while let Some(msg) = self.receiver.recv().await {
            let op = msg.op();
            let delay = self.latency.for_op(op);

            if let Some(reason) = self.faults.inject(op) {
                warn!(entity_type, ?op, %reason, "Injected failure");
                reject(msg, delay, FrameworkError::Unavailable(reason));
                continue;
            }

            match msg {
                SourceRequest::List { respond_to } => {
                    let items: Vec<T> = self
                        .order
                        .iter()
                        .filter_map(|id| self.store.get(id).cloned())
                        .collect();
                    debug!(entity_type, count = items.len(), "List");
                    reply(respond_to, delay, Ok(items));
                }
                SourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let found = item.is_some();
                    debug!(entity_type, %id, found, "Get");
                    reply(respond_to, delay, Ok(item));
                }
                SourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?action, "Action");
                    if let Some(item) = self.store.get_mut(&id) {
                        // Await the async hook
                        let result = item
                            .handle_action(action, &context)
                            .await
                            .map_err(|e| FrameworkError::EntityError(Box::new(e)));
                        match &result {
                            Ok(_) => info!(entity_type, %id, "Action ok"),
                            Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                        }
                        reply(respond_to, delay, result);
                    } else {
                        warn!(entity_type, %id, "Not found");
                        reply(respond_to, delay, Err(FrameworkError::NotFound(id.to_string())));
                    }
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }
}

fn reject<T: SourceEntity>(msg: SourceRequest<T>, delay: Duration, error: FrameworkError) {
    match msg {
        SourceRequest::List { respond_to } => reply(respond_to, delay, Err(error)),
        SourceRequest::Get { respond_to, .. } => reply(respond_to, delay, Err(error)),
        SourceRequest::Action { respond_to, .. } => reply(respond_to, delay, Err(error)),
    }
}

/// Sends a reply now, or after `delay` on a spawned task.
fn reply<R: Send + 'static>(
    respond_to: Response<R>,
    delay: Duration,
    result: Result<R, FrameworkError>,
) {
    if delay.is_zero() {
        let _ = respond_to.send(result);
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = respond_to.send(result);
    });
}
