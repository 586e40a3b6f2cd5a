//! # Mock Source & Testing Guide
//!
//! `MockClient<T>` hands out a real [`SourceClient<T>`] whose requests are answered from a
//! queue of expectations instead of a [`SourceActor`](crate::SourceActor). Use it to test
//! anything built on a source client (inventory clients, loaders, trackers) deterministically,
//! including failures that are awkward to provoke for real.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real SourceActor |
//! |---------|------------|------------------|
//! | **Speed** | Instant (in-memory) | Fast, plus any configured latency |
//! | **Determinism** | 100% Deterministic | Deterministic with `ScriptedFaults` |
//! | **State** | No real state (expectations) | Real records |
//! | **Use Case** | Logic *around* the client | The source itself or the full system |
//!
//! ## Example
//!
//! ```rust
//! use fetcher_framework::mock::MockClient;
//! use fetcher_framework::{FrameworkError, SourceEntity};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug, PartialEq)] struct Note { id: u32 }
//! #[derive(Debug)] enum NoteAction {}
//! #[derive(Debug, thiserror::Error)] #[error("Err")] struct NoteError;
//!
//! #[async_trait]
//! impl SourceEntity for Note {
//!     type Id = u32; type Action = NoteAction; type ActionResult = ();
//!     type Context = (); type Error = NoteError;
//!     fn id(&self) -> u32 { self.id }
//!     async fn handle_action(&mut self, _: NoteAction, _: &()) -> Result<(), NoteError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Note>::new();
//!     mock.expect_list().return_err(FrameworkError::Unavailable("down".into()));
//!     mock.expect_list().return_ok(vec![Note { id: 1 }]);
//!
//!     let client = mock.client();
//!     assert!(client.list().await.is_err());
//!     assert_eq!(client.list().await.unwrap(), vec![Note { id: 1 }]);
//!     mock.verify();
//! }
//! ```
//!
//! ## Mocking Utilities
//!
//! Use [`create_mock_client`] to get a client and the raw receiver when a test needs to inspect
//! the request itself, or the fluent [`MockClient`] API when only the replies matter.

use crate::client::SourceClient;
use crate::entity::SourceEntity;
use crate::error::FrameworkError;
use crate::message::SourceRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the reply to give.
enum Expectation<T: SourceEntity> {
    List {
        response: Result<Vec<T>, FrameworkError>,
    },
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock source with expectation tracking for fluent testing.
///
/// Requests must arrive in the order the expectations were queued; a mismatch panics the
/// background task, which drops the reply channel and surfaces as
/// [`FrameworkError::ActorDropped`] in the caller.
pub struct MockClient<T: SourceEntity> {
    client: SourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: SourceEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SourceEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<SourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        // Spawn background task to handle requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone.lock().unwrap().pop_front();

                match (request, expectation) {
                    (SourceRequest::List { respond_to }, Some(Expectation::List { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        SourceRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "Get for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        SourceRequest::Action { id, respond_to, .. },
                        Some(Expectation::Action {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "Action for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        panic!("Unexpected {:?} request or expectation mismatch", request.op());
                    }
                }
            }
        });

        Self {
            client: SourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> SourceClient<T> {
        self.client.clone()
    }

    /// Expects a `list` operation.
    pub fn expect_list(&mut self) -> ListExpectationBuilder<T> {
        ListExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `get` operation.
    pub fn expect_get(&mut self, id: T::Id) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects an `action` operation.
    pub fn expect_action(&mut self, id: T::Id) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for `list` expectations.
pub struct ListExpectationBuilder<T: SourceEntity> {
    expectations: Expectations<T>,
}

impl<T: SourceEntity> ListExpectationBuilder<T> {
    pub fn return_ok(self, records: Vec<T>) {
        self.push(Ok(records));
    }

    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Vec<T>, FrameworkError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::List { response });
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T: SourceEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: SourceEntity> GetExpectationBuilder<T> {
    pub fn return_ok(self, value: Option<T>) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<Option<T>, FrameworkError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Get {
                id: self.id,
                response,
            });
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: SourceEntity> {
    id: T::Id,
    expectations: Expectations<T>,
}

impl<T: SourceEntity> ActionExpectationBuilder<T> {
    pub fn return_ok(self, result: T::ActionResult) {
        self.push(Ok(result));
    }

    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T::ActionResult, FrameworkError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Action {
                id: self.id,
                response,
            });
    }
}

// =============================================================================
// RAW RECEIVER HELPERS
// =============================================================================

/// Creates a client and the receiver of its requests.
///
/// The test plays the actor: it takes each request off `receiver`, asserts on it, and replies
/// through the returned sender, which makes timing fully controllable.
pub fn create_mock_client<T: SourceEntity>(
    buffer_size: usize,
) -> (SourceClient<T>, mpsc::Receiver<SourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (SourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a List request
pub async fn expect_list<T: SourceEntity>(
    receiver: &mut mpsc::Receiver<SourceRequest<T>>,
) -> Option<oneshot::Sender<Result<Vec<T>, FrameworkError>>> {
    match receiver.recv().await {
        Some(SourceRequest::List { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: SourceEntity>(
    receiver: &mut mpsc::Receiver<SourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(SourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: SourceEntity>(
    receiver: &mut mpsc::Receiver<SourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(SourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}
