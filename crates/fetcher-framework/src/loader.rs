//! # Loader Retry Controller
//!
//! Wraps a fallible read and exposes its lifecycle as a [`FetchPhase`]. Retries are always
//! user-initiated through [`LoaderClient::revalidate`]; the controller never refetches on its
//! own.
//!
//! At most one read is in flight. A revalidation that arrives while a read is running joins
//! that read and receives its outcome instead of starting a second one. A
//! [`refresh`](LoaderClient::refresh) must observe writes made before it was sent, so it never
//! joins: it is queued behind the running read, and exactly one follow-up read serves every
//! refresh queued during it.

use crate::error::FetchError;
use crate::tracker::Revalidate;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Lifecycle of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPhase<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for FetchPhase<T> {
    fn default() -> Self {
        FetchPhase::Idle
    }
}

impl<T> FetchPhase<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchPhase::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FetchPhase::Loaded(_))
    }

    /// Finished, successfully or not.
    pub fn is_resolved(&self) -> bool {
        matches!(self, FetchPhase::Loaded(_) | FetchPhase::Failed(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchPhase::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            FetchPhase::Idle => "idle",
            FetchPhase::Loading => "loading",
            FetchPhase::Loaded(_) => "loaded",
            FetchPhase::Failed(_) => "failed",
        }
    }
}

/// The read a loader wraps.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    type Output: Clone + Send + Sync + Debug + PartialEq + 'static;

    async fn fetch(&self) -> Result<Self::Output, FetchError>;
}

type PhaseOf<F> = FetchPhase<<F as Fetcher>::Output>;

enum LoaderRequest<F: Fetcher> {
    Load {
        respond_to: oneshot::Sender<PhaseOf<F>>,
    },
    Revalidate {
        respond_to: oneshot::Sender<PhaseOf<F>>,
    },
    Refresh {
        respond_to: oneshot::Sender<PhaseOf<F>>,
    },
    Phase {
        respond_to: oneshot::Sender<PhaseOf<F>>,
    },
    LastLoaded {
        respond_to: oneshot::Sender<Option<F::Output>>,
    },
    Subscribe {
        respond_to: oneshot::Sender<watch::Receiver<PhaseOf<F>>>,
    },
}

/// A caller waiting for the outcome of read number `after` or any later one.
struct Waiter<F: Fetcher> {
    after: u64,
    respond_to: oneshot::Sender<PhaseOf<F>>,
}

/// The actor owning one read's lifecycle.
pub struct LoaderController<F: Fetcher> {
    receiver: mpsc::Receiver<LoaderRequest<F>>,
    phase: watch::Sender<PhaseOf<F>>,
    last_loaded: Option<F::Output>,
    waiters: Vec<Waiter<F>>,
    inflight: JoinSet<Result<F::Output, FetchError>>,
    /// Number of reads started so far; the running read, if any, is the last one.
    attempts: u64,
}

impl<F: Fetcher> LoaderController<F> {
    /// Creates a controller in the `Idle` phase and its client.
    pub fn new(buffer_size: usize) -> (Self, LoaderClient<F>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (phase, _) = watch::channel(FetchPhase::Idle);
        let controller = Self {
            receiver,
            phase,
            last_loaded: None,
            waiters: Vec::new(),
            inflight: JoinSet::new(),
            attempts: 0,
        };
        (controller, LoaderClient { sender })
    }

    /// Runs the controller loop until every client is dropped.
    pub async fn run(mut self, fetcher: F) {
        let fetcher = Arc::new(fetcher);
        let source = std::any::type_name::<F>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(source, "Loader started");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle(msg, &fetcher),
                    None => break,
                },
                Some(joined) = self.inflight.join_next() => {
                    let result = joined.unwrap_or_else(|e| {
                        Err(FetchError::Source(format!("Fetch task failed: {e}")))
                    });
                    self.complete(result, &fetcher);
                }
            }
        }

        info!(source, attempts = self.attempts, "Shutdown");
    }

    fn handle(&mut self, msg: LoaderRequest<F>, fetcher: &Arc<F>) {
        let loading = self.phase.borrow().is_loading();
        // Joining callers accept the running read; a refresh needs the next one.
        let joinable = if loading {
            self.attempts
        } else {
            self.attempts + 1
        };

        match msg {
            LoaderRequest::Load { respond_to } => {
                let resolved = {
                    let phase = self.phase.borrow();
                    phase.is_resolved().then(|| phase.clone())
                };
                if let Some(resolved) = resolved {
                    debug!(phase = resolved.label(), "Already loaded, load ignored");
                    let _ = respond_to.send(resolved);
                    return;
                }
                self.wait(joinable, respond_to);
            }
            LoaderRequest::Revalidate { respond_to } => {
                if loading {
                    debug!("Revalidation joined in-flight read");
                }
                self.wait(joinable, respond_to);
            }
            LoaderRequest::Refresh { respond_to } => {
                if loading {
                    debug!(running = self.attempts, "Refresh queued behind in-flight read");
                }
                self.wait(self.attempts + 1, respond_to);
            }
            LoaderRequest::Phase { respond_to } => {
                let _ = respond_to.send(self.phase.borrow().clone());
                return;
            }
            LoaderRequest::LastLoaded { respond_to } => {
                let _ = respond_to.send(self.last_loaded.clone());
                return;
            }
            LoaderRequest::Subscribe { respond_to } => {
                let _ = respond_to.send(self.phase.subscribe());
                return;
            }
        }

        if !loading {
            self.start(fetcher);
        }
    }

    fn wait(&mut self, after: u64, respond_to: oneshot::Sender<PhaseOf<F>>) {
        self.waiters.push(Waiter { after, respond_to });
    }

    fn start(&mut self, fetcher: &Arc<F>) {
        self.attempts += 1;
        self.phase.send_replace(FetchPhase::Loading);
        info!(attempt = self.attempts, "Loading");

        let fetcher = Arc::clone(fetcher);
        self.inflight.spawn(async move { fetcher.fetch().await });
    }

    fn complete(&mut self, result: Result<F::Output, FetchError>, fetcher: &Arc<F>) {
        let phase = match result {
            Ok(data) => {
                info!(attempt = self.attempts, "Loaded");
                self.last_loaded = Some(data.clone());
                FetchPhase::Loaded(data)
            }
            Err(e) => {
                warn!(attempt = self.attempts, error = %e, "Load failed");
                FetchPhase::Failed(e.to_string())
            }
        };
        self.phase.send_replace(phase.clone());

        let read = self.attempts;
        let (served, queued): (Vec<_>, Vec<_>) = self
            .waiters
            .drain(..)
            .partition(|waiter| waiter.after <= read);
        for waiter in served {
            let _ = waiter.respond_to.send(phase.clone());
        }
        self.waiters = queued;

        if !self.waiters.is_empty() {
            debug!(queued = self.waiters.len(), "Starting queued read");
            self.start(fetcher);
        }
    }
}

/// Cloneable handle to a [`LoaderController`].
pub struct LoaderClient<F: Fetcher> {
    sender: mpsc::Sender<LoaderRequest<F>>,
}

impl<F: Fetcher> Clone for LoaderClient<F> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<F: Fetcher> LoaderClient<F> {
    async fn call<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> LoaderRequest<F>,
    ) -> Result<R, FetchError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FetchError::Closed)?;
        response.await.map_err(|_| FetchError::Closed)
    }

    /// Initial read, on mount. Resolves to `Loaded` or `Failed`.
    ///
    /// Once a read has resolved, later calls return the current phase without refetching.
    pub async fn load(&self) -> Result<PhaseOf<F>, FetchError> {
        self.call(|respond_to| LoaderRequest::Load { respond_to })
            .await
    }

    /// Re-runs the read and resolves to its outcome.
    pub async fn revalidate(&self) -> Result<PhaseOf<F>, FetchError> {
        self.call(|respond_to| LoaderRequest::Revalidate { respond_to })
            .await
    }

    /// Runs a read that starts after this call and resolves to its outcome.
    ///
    /// Unlike [`revalidate`](Self::revalidate), this never reuses a read already in flight,
    /// so the result reflects every write that completed before the call.
    pub async fn refresh(&self) -> Result<PhaseOf<F>, FetchError> {
        self.call(|respond_to| LoaderRequest::Refresh { respond_to })
            .await
    }

    pub async fn current_phase(&self) -> Result<PhaseOf<F>, FetchError> {
        self.call(|respond_to| LoaderRequest::Phase { respond_to })
            .await
    }

    /// Output of the last successful read, kept across later failures.
    pub async fn last_loaded(&self) -> Result<Option<F::Output>, FetchError> {
        self.call(|respond_to| LoaderRequest::LastLoaded { respond_to })
            .await
    }

    pub async fn subscribe(&self) -> Result<watch::Receiver<PhaseOf<F>>, FetchError> {
        self.call(|respond_to| LoaderRequest::Subscribe { respond_to })
            .await
    }
}

#[async_trait]
impl<F: Fetcher> Revalidate for LoaderClient<F> {
    async fn revalidate(&self) -> bool {
        matches!(self.refresh().await, Ok(FetchPhase::Loaded(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Pops scripted outcomes; succeeds with the call number once empty.
    struct ScriptedFetcher {
        outcomes: Mutex<VecDeque<Result<u32, &'static str>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn new(outcomes: Vec<Result<u32, &'static str>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let fetcher = Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Arc::clone(&calls),
            };
            (fetcher, calls)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        type Output = u32;

        async fn fetch(&self) -> Result<u32, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u32 + 1;
            tokio::time::sleep(Duration::from_millis(200)).await;
            let next = self.outcomes.lock().unwrap().pop_front();
            match next {
                Some(Ok(value)) => Ok(value),
                Some(Err(message)) => Err(FetchError::Source(message.to_string())),
                None => Ok(call),
            }
        }
    }

    fn spawn_loader(
        outcomes: Vec<Result<u32, &'static str>>,
    ) -> (LoaderClient<ScriptedFetcher>, Arc<AtomicUsize>) {
        let (fetcher, calls) = ScriptedFetcher::new(outcomes);
        let (controller, client) = LoaderController::new(8);
        tokio::spawn(controller.run(fetcher));
        (client, calls)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn load_moves_from_idle_through_loading() {
        let (client, _) = spawn_loader(vec![Ok(10)]);
        assert_eq!(client.current_phase().await.unwrap(), FetchPhase::Idle);

        let mut phases = client.subscribe().await.unwrap();
        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.load().await }
        });
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow(), FetchPhase::Loading);

        assert_eq!(pending.await.unwrap().unwrap(), FetchPhase::Loaded(10));
        assert_eq!(client.current_phase().await.unwrap(), FetchPhase::Loaded(10));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failed_load_recovers_on_revalidate() {
        let (client, calls) = spawn_loader(vec![Err("Failed to load inventory"), Ok(7)]);

        let phase = client.load().await.unwrap();
        assert_eq!(phase.error(), Some("Failed to load inventory"));
        assert_eq!(client.last_loaded().await.unwrap(), None);

        assert_eq!(client.revalidate().await.unwrap(), FetchPhase::Loaded(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn last_loaded_survives_a_failed_revalidation() {
        let (client, _) = spawn_loader(vec![Ok(3), Err("flaky")]);

        client.load().await.unwrap();
        let phase = client.revalidate().await.unwrap();
        assert!(matches!(phase, FetchPhase::Failed(_)));
        assert_eq!(client.last_loaded().await.unwrap(), Some(3));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn revalidate_while_loading_joins_the_inflight_read() {
        let (client, calls) = spawn_loader(vec![Ok(1)]);

        let (a, b, c) = tokio::join!(client.load(), client.revalidate(), client.revalidate());
        assert_eq!(a.unwrap(), FetchPhase::Loaded(1));
        assert_eq!(b.unwrap(), FetchPhase::Loaded(1));
        assert_eq!(c.unwrap(), FetchPhase::Loaded(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn refresh_during_a_read_waits_for_one_follow_up_read() {
        let (client, calls) = spawn_loader(vec![]);

        let mut phases = client.subscribe().await.unwrap();
        let first = tokio::spawn({
            let client = client.clone();
            async move { client.load().await }
        });
        phases.wait_for(|phase| phase.is_loading()).await.unwrap();

        let (a, b) = tokio::join!(client.refresh(), client.refresh());
        assert_eq!(first.await.unwrap().unwrap(), FetchPhase::Loaded(1));
        assert_eq!(a.unwrap(), FetchPhase::Loaded(2));
        assert_eq!(b.unwrap(), FetchPhase::Loaded(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.current_phase().await.unwrap(), FetchPhase::Loaded(2));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn refresh_when_resolved_reads_once() {
        let (client, calls) = spawn_loader(vec![Ok(4)]);

        client.load().await.unwrap();
        assert_eq!(client.refresh().await.unwrap(), FetchPhase::Loaded(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn sequential_revalidations_converge() {
        let (client, calls) = spawn_loader(vec![Err("a"), Err("b"), Err("c"), Ok(99)]);

        let mut phase = client.load().await.unwrap();
        let mut attempts = 1;
        while !phase.is_loaded() {
            assert!(phase.is_resolved(), "phase stuck in {}", phase.label());
            phase = client.revalidate().await.unwrap();
            attempts += 1;
        }
        assert_eq!(attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(phase, FetchPhase::Loaded(99));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn load_after_resolution_does_not_refetch() {
        let (client, calls) = spawn_loader(vec![Ok(5)]);

        client.load().await.unwrap();
        assert_eq!(client.load().await.unwrap(), FetchPhase::Loaded(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn revalidate_hook_reports_freshness() {
        let (client, _) = spawn_loader(vec![Err("down"), Ok(1)]);

        assert!(!Revalidate::revalidate(&client).await);
        assert!(Revalidate::revalidate(&client).await);
    }
}
