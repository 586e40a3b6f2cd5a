//! # Mutation Tracker
//!
//! Coordinates at most one in-flight mutation per key and publishes each key's
//! [`MutationState`] through a [`KeyedStore`], so any number of views can derive an optimistic
//! projection from the same value.
//!
//! ## Lifecycle of one key
//!
//! ```text
//!            begin(request)               commit resolves
//!   Idle ───────────────────▶ Submitting ─────────────────▶ Settled(result)
//!    ▲                                                          │
//!    └──────── fresh revalidation, result was Ok ───────────────┘
//! ```
//!
//! * `Settled(Err)` stays visible until the next `begin` for that key or a `reset`.
//! * A failed revalidation leaves `Settled` untouched.
//! * The tracker never restores an old value itself. Rollback comes from re-reading the
//!   authoritative source through the [`Revalidate`] hook.

use crate::error::MutationError;
use crate::store::KeyedStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Per-key state of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<R, O> {
    Idle,
    /// In flight, carrying the request that started it.
    Submitting(R),
    /// Resolved; the error is a display message.
    Settled(Result<O, String>),
}

impl<R, O> Default for MutationState<R, O> {
    fn default() -> Self {
        MutationState::Idle
    }
}

impl<R, O> MutationState<R, O> {
    pub fn is_idle(&self) -> bool {
        matches!(self, MutationState::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, MutationState::Submitting(_))
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, MutationState::Settled(_))
    }

    /// The in-flight request, if any.
    pub fn request(&self) -> Option<&R> {
        match self {
            MutationState::Submitting(request) => Some(request),
            _ => None,
        }
    }

    /// The output of a successful mutation that has not yet been revalidated.
    pub fn output(&self) -> Option<&O> {
        match self {
            MutationState::Settled(Ok(output)) => Some(output),
            _ => None,
        }
    }

    /// The error message of a failed mutation.
    pub fn error(&self) -> Option<&str> {
        match self {
            MutationState::Settled(Err(message)) => Some(message),
            _ => None,
        }
    }
}

/// The mutation a tracker coordinates.
#[async_trait]
pub trait Mutator: Send + Sync + 'static {
    /// Entity key; one in-flight mutation per key.
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// Input payload, exposed to views while in flight.
    type Request: Clone + Send + Sync + Debug + PartialEq + 'static;

    /// Value returned by a successful commit.
    type Output: Clone + Send + Sync + Debug + PartialEq + 'static;

    /// The key a request belongs to.
    fn key(request: &Self::Request) -> Self::Key;

    /// Performs the mutation. The error is shown to the user as-is.
    async fn commit(&self, request: Self::Request) -> Result<Self::Output, String>;
}

/// Re-runs an authoritative read.
///
/// The read must start after the call, so it observes the mutation that just settled.
#[async_trait]
pub trait Revalidate: Send + Sync + 'static {
    /// Returns `true` when the read produced fresh data.
    async fn revalidate(&self) -> bool;
}

/// State published for a mutator's keys.
pub type StateOf<M> = MutationState<<M as Mutator>::Request, <M as Mutator>::Output>;

/// Dependencies injected into [`MutationTracker::run`].
pub struct TrackerContext<M: Mutator> {
    pub mutator: Arc<M>,
    pub revalidator: Option<Arc<dyn Revalidate>>,
}

impl<M: Mutator> TrackerContext<M> {
    pub fn new(mutator: M) -> Self {
        Self {
            mutator: Arc::new(mutator),
            revalidator: None,
        }
    }

    /// Source to re-read after every settled mutation.
    pub fn with_revalidator(mut self, revalidator: impl Revalidate) -> Self {
        self.revalidator = Some(Arc::new(revalidator));
        self
    }
}

enum TrackerRequest<M: Mutator> {
    Begin {
        request: M::Request,
        respond_to: oneshot::Sender<Result<(), MutationError>>,
    },
    Observe {
        key: M::Key,
        respond_to: oneshot::Sender<StateOf<M>>,
    },
    Subscribe {
        key: M::Key,
        respond_to: oneshot::Sender<watch::Receiver<StateOf<M>>>,
    },
    Snapshot {
        respond_to: oneshot::Sender<Vec<(M::Key, StateOf<M>)>>,
    },
    Reset {
        key: Option<M::Key>,
        respond_to: oneshot::Sender<usize>,
    },
}

/// Outcome of a background task, fed back into the tracker loop.
enum Settlement<M: Mutator> {
    Committed {
        key: M::Key,
        attempt: u64,
        result: Result<M::Output, String>,
    },
    Revalidated {
        key: M::Key,
        attempt: u64,
        fresh: bool,
    },
}

/// The actor owning every key's mutation state.
///
/// Requests and task completions are handled on one loop, so state transitions never
/// interleave. Commits and revalidations run on a [`JoinSet`]; the loop keeps answering
/// `observe` while they are in flight.
pub struct MutationTracker<M: Mutator> {
    receiver: mpsc::Receiver<TrackerRequest<M>>,
    store: KeyedStore<M::Key, StateOf<M>>,
    attempts: HashMap<M::Key, u64>,
    inflight: JoinSet<Settlement<M>>,
}

impl<M: Mutator> MutationTracker<M> {
    /// Creates a tracker and its client.
    pub fn new(buffer_size: usize) -> (Self, TrackerClient<M>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let tracker = Self {
            receiver,
            store: KeyedStore::new(),
            attempts: HashMap::new(),
            inflight: JoinSet::new(),
        };
        (tracker, TrackerClient { sender })
    }

    /// Runs the tracker loop until every client is dropped.
    ///
    /// Mutations still in flight at that point are aborted.
    pub async fn run(mut self, context: TrackerContext<M>) {
        let mutator = std::any::type_name::<M>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(mutator, "Tracker started");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle(msg, &context),
                    None => break,
                },
                Some(joined) = self.inflight.join_next() => match joined {
                    Ok(settlement) => self.settle(settlement, &context),
                    Err(e) => warn!(mutator, error = %e, "Tracker task failed"),
                },
            }
        }

        info!(mutator, aborted = self.inflight.len(), "Shutdown");
    }

    fn handle(&mut self, msg: TrackerRequest<M>, context: &TrackerContext<M>) {
        match msg {
            TrackerRequest::Begin {
                request,
                respond_to,
            } => {
                let _ = respond_to.send(self.begin(request, context));
            }
            TrackerRequest::Observe { key, respond_to } => {
                let _ = respond_to.send(self.store.get(&key));
            }
            TrackerRequest::Subscribe { key, respond_to } => {
                let _ = respond_to.send(self.store.subscribe(key));
            }
            TrackerRequest::Snapshot { respond_to } => {
                let _ = respond_to.send(self.store.entries());
            }
            TrackerRequest::Reset { key, respond_to } => {
                let keys: Vec<M::Key> = match key {
                    Some(key) => vec![key],
                    None => self.store.keys().cloned().collect(),
                };
                let mut cleared = 0;
                for key in keys {
                    if self.store.get(&key).is_settled() {
                        self.store.set(key, MutationState::Idle);
                        cleared += 1;
                    }
                }
                let pruned = self.store.retain_idle();
                debug!(cleared, pruned, "Reset");
                let _ = respond_to.send(cleared);
            }
        }
    }

    fn begin(
        &mut self,
        request: M::Request,
        context: &TrackerContext<M>,
    ) -> Result<(), MutationError> {
        let key = M::key(&request);
        if self.store.get(&key).is_submitting() {
            warn!(%key, "Rejected: already submitting");
            return Err(MutationError::AlreadySubmitting(key.to_string()));
        }

        let attempt = self.attempts.entry(key.clone()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        // The payload becomes visible before the commit is issued.
        self.store
            .set(key.clone(), MutationState::Submitting(request.clone()));
        info!(%key, attempt, ?request, "Submitting");

        let mutator = Arc::clone(&context.mutator);
        self.inflight.spawn(async move {
            let commit = tokio::spawn(async move { mutator.commit(request).await });
            let result = match commit.await {
                Ok(result) => result,
                Err(e) => Err(format!("Mutation task failed: {e}")),
            };
            Settlement::Committed {
                key,
                attempt,
                result,
            }
        });
        Ok(())
    }

    fn settle(&mut self, settlement: Settlement<M>, context: &TrackerContext<M>) {
        match settlement {
            Settlement::Committed {
                key,
                attempt,
                result,
            } => {
                if !self.is_current(&key, attempt) {
                    debug!(%key, attempt, "Stale commit ignored");
                    return;
                }
                match &result {
                    Ok(_) => info!(%key, attempt, "Settled ok"),
                    Err(e) => warn!(%key, attempt, error = %e, "Settled with error"),
                }
                // Replaces the Submitting payload in the same write.
                self.store.set(key.clone(), MutationState::Settled(result));

                if let Some(revalidator) = &context.revalidator {
                    let revalidator = Arc::clone(revalidator);
                    self.inflight.spawn(async move {
                        let fresh = revalidator.revalidate().await;
                        Settlement::Revalidated {
                            key,
                            attempt,
                            fresh,
                        }
                    });
                }
            }
            Settlement::Revalidated {
                key,
                attempt,
                fresh,
            } => {
                if !self.is_current(&key, attempt) {
                    debug!(%key, attempt, "Stale revalidation ignored");
                    return;
                }
                let state = self.store.get(&key);
                match (fresh, &state) {
                    (true, MutationState::Settled(Ok(_))) => {
                        self.store.set(key.clone(), MutationState::Idle);
                        debug!(%key, attempt, "Revalidated, back to idle");
                    }
                    (true, _) => debug!(%key, attempt, "Revalidated, error kept visible"),
                    (false, _) => {
                        warn!(%key, attempt, "Revalidation failed, keeping settled state")
                    }
                }
            }
        }
    }

    fn is_current(&self, key: &M::Key, attempt: u64) -> bool {
        self.attempts.get(key) == Some(&attempt)
    }
}

/// Cloneable handle to a [`MutationTracker`].
pub struct TrackerClient<M: Mutator> {
    sender: mpsc::Sender<TrackerRequest<M>>,
}

impl<M: Mutator> Clone for TrackerClient<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M: Mutator> TrackerClient<M> {
    async fn call<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> TrackerRequest<M>,
    ) -> Result<R, MutationError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| MutationError::Closed)?;
        response.await.map_err(|_| MutationError::Closed)
    }

    /// Starts a mutation. Returns once it is `Submitting`, not once it settles.
    pub async fn begin(&self, request: M::Request) -> Result<(), MutationError> {
        self.call(|respond_to| TrackerRequest::Begin {
            request,
            respond_to,
        })
        .await?
    }

    /// Current state of `key`.
    pub async fn observe(&self, key: M::Key) -> Result<StateOf<M>, MutationError> {
        self.call(|respond_to| TrackerRequest::Observe { key, respond_to })
            .await
    }

    /// Receiver that follows `key`. Every receiver of a key sees the same value.
    pub async fn subscribe(
        &self,
        key: M::Key,
    ) -> Result<watch::Receiver<StateOf<M>>, MutationError> {
        self.call(|respond_to| TrackerRequest::Subscribe { key, respond_to })
            .await
    }

    /// Every key that is not idle.
    pub async fn snapshot(&self) -> Result<Vec<(M::Key, StateOf<M>)>, MutationError> {
        self.call(|respond_to| TrackerRequest::Snapshot { respond_to })
            .await
    }

    /// Clears a settled state. Returns whether anything was cleared.
    pub async fn reset(&self, key: M::Key) -> Result<bool, MutationError> {
        let cleared = self
            .call(|respond_to| TrackerRequest::Reset {
                key: Some(key),
                respond_to,
            })
            .await?;
        Ok(cleared > 0)
    }

    /// Clears every settled state, e.g. on navigation. In-flight mutations are kept.
    pub async fn reset_all(&self) -> Result<usize, MutationError> {
        self.call(|respond_to| TrackerRequest::Reset {
            key: None,
            respond_to,
        })
        .await
    }

    /// Waits until the state of `key` satisfies `predicate` and returns it.
    pub async fn wait_for(
        &self,
        key: M::Key,
        predicate: impl FnMut(&StateOf<M>) -> bool,
    ) -> Result<StateOf<M>, MutationError> {
        let mut rx = self.subscribe(key).await?;
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| MutationError::Closed)?
            .clone();
        Ok(state)
    }

    /// Waits until `key` is no longer in flight.
    pub async fn wait_settled(&self, key: M::Key) -> Result<StateOf<M>, MutationError> {
        self.wait_for(key, |state| !state.is_submitting()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Bump {
        key: &'static str,
    }

    struct SlowCounter {
        delay: Duration,
        fail_with: Option<&'static str>,
        commits: Arc<AtomicUsize>,
    }

    impl SlowCounter {
        fn new(fail_with: Option<&'static str>) -> (Self, Arc<AtomicUsize>) {
            let commits = Arc::new(AtomicUsize::new(0));
            let mutator = Self {
                delay: Duration::from_secs(1),
                fail_with,
                commits: Arc::clone(&commits),
            };
            (mutator, commits)
        }
    }

    #[async_trait]
    impl Mutator for SlowCounter {
        type Key = &'static str;
        type Request = Bump;
        type Output = usize;

        fn key(request: &Bump) -> &'static str {
            request.key
        }

        async fn commit(&self, _request: Bump) -> Result<usize, String> {
            tokio::time::sleep(self.delay).await;
            let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_with {
                Some(message) => Err(message.to_string()),
                None => Ok(n),
            }
        }
    }

    struct Panicky;

    #[async_trait]
    impl Mutator for Panicky {
        type Key = &'static str;
        type Request = Bump;
        type Output = usize;

        fn key(request: &Bump) -> &'static str {
            request.key
        }

        async fn commit(&self, _request: Bump) -> Result<usize, String> {
            panic!("boom");
        }
    }

    struct FixedRevalidator {
        fresh: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Revalidate for FixedRevalidator {
        async fn revalidate(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fresh
        }
    }

    fn spawn_tracker<M: Mutator>(
        mutator: M,
        fresh: Option<bool>,
    ) -> (TrackerClient<M>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut context = TrackerContext::new(mutator);
        if let Some(fresh) = fresh {
            context = context.with_revalidator(FixedRevalidator {
                fresh,
                calls: Arc::clone(&calls),
            });
        }
        let (tracker, client) = MutationTracker::new(16);
        tokio::spawn(tracker.run(context));
        (client, calls)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn begin_exposes_request_then_returns_to_idle() {
        let (mutator, commits) = SlowCounter::new(None);
        let (client, revalidations) = spawn_tracker(mutator, Some(true));

        client.begin(Bump { key: "a" }).await.unwrap();
        let state = client.observe("a").await.unwrap();
        assert_eq!(state, MutationState::Submitting(Bump { key: "a" }));
        assert_eq!(commits.load(Ordering::SeqCst), 0);

        let state = client.wait_for("a", |s| s.is_idle()).await.unwrap();
        assert_eq!(state, MutationState::Idle);
        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert_eq!(revalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn second_begin_for_same_key_is_rejected() {
        let (mutator, commits) = SlowCounter::new(None);
        let (client, _) = spawn_tracker(mutator, None);

        client.begin(Bump { key: "a" }).await.unwrap();
        let second = client.begin(Bump { key: "a" }).await;
        assert_eq!(second, Err(MutationError::AlreadySubmitting("a".into())));

        let state = client.wait_settled("a").await.unwrap();
        assert_eq!(state, MutationState::Settled(Ok(1)));
        assert_eq!(commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn distinct_keys_are_in_flight_together() {
        let (mutator, _) = SlowCounter::new(None);
        let (client, _) = spawn_tracker(mutator, None);

        client.begin(Bump { key: "a" }).await.unwrap();
        client.begin(Bump { key: "b" }).await.unwrap();

        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|(_, state)| state.is_submitting()));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failure_stays_visible_after_fresh_revalidation() {
        let (mutator, _) = SlowCounter::new(Some("Out of stock"));
        let (client, revalidations) = spawn_tracker(mutator, Some(true));

        client.begin(Bump { key: "a" }).await.unwrap();
        let state = client.wait_settled("a").await.unwrap();
        assert_eq!(state.error(), Some("Out of stock"));

        // Let the revalidation run to completion.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(revalidations.load(Ordering::SeqCst), 1);
        let state = client.observe("a").await.unwrap();
        assert_eq!(state.error(), Some("Out of stock"));

        // A new attempt replaces the error.
        client.begin(Bump { key: "a" }).await.unwrap();
        assert!(client.observe("a").await.unwrap().is_submitting());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failed_revalidation_keeps_settled_output() {
        let (mutator, _) = SlowCounter::new(None);
        let (client, revalidations) = spawn_tracker(mutator, Some(false));

        client.begin(Bump { key: "a" }).await.unwrap();
        client.wait_settled("a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(revalidations.load(Ordering::SeqCst), 1);
        assert_eq!(client.observe("a").await.unwrap().output(), Some(&1));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn subscribers_of_a_key_observe_identical_states() {
        let (mutator, _) = SlowCounter::new(None);
        let (client, _) = spawn_tracker(mutator, None);

        let stock_view = client.subscribe("a").await.unwrap();
        let button_view = client.subscribe("a").await.unwrap();
        client.begin(Bump { key: "a" }).await.unwrap();

        assert_eq!(*stock_view.borrow(), *button_view.borrow());
        assert!(stock_view.borrow().is_submitting());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn reset_clears_settled_but_not_submitting() {
        let (mutator, _) = SlowCounter::new(Some("nope"));
        let (client, _) = spawn_tracker(mutator, None);

        client.begin(Bump { key: "a" }).await.unwrap();
        client.wait_settled("a").await.unwrap();
        client.begin(Bump { key: "b" }).await.unwrap();

        assert_eq!(client.reset_all().await.unwrap(), 1);
        assert!(client.observe("a").await.unwrap().is_idle());
        assert!(client.observe("b").await.unwrap().is_submitting());
        assert!(!client.reset("b").await.unwrap());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn panicking_commit_settles_with_error() {
        let (client, _) = spawn_tracker(Panicky, None);

        client.begin(Bump { key: "a" }).await.unwrap();
        let state = client.wait_settled("a").await.unwrap();
        assert!(state.error().unwrap().contains("Mutation task failed"));
    }

    #[tokio::test]
    async fn client_reports_closed_tracker() {
        let (tracker, client) = MutationTracker::<SlowCounter>::new(4);
        drop(tracker);
        assert_eq!(client.observe("a").await, Err(MutationError::Closed));
    }
}
