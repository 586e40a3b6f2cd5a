//! # Source Client
//!
//! The generic handle for talking to a [`SourceActor`](crate::SourceActor).

use crate::entity::SourceEntity;
use crate::error::FrameworkError;
use crate::message::SourceRequest;
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for interacting with a `SourceActor`.
///
/// Holds only a sender, so cloning is cheap. Every method resolves once the actor replies,
/// including any configured latency.
#[derive(Clone)]
pub struct SourceClient<T: SourceEntity> {
    sender: mpsc::Sender<SourceRequest<T>>,
}

impl<T: SourceEntity> SourceClient<T> {
    pub fn new(sender: mpsc::Sender<SourceRequest<T>>) -> Self {
        Self { sender }
    }

    pub async fn list(&self) -> Result<Vec<T>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SourceRequest::List { respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SourceRequest::Get { id, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SourceRequest::Action {
                id,
                action,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}
