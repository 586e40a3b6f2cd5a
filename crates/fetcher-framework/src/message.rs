//! # Source Messages
//!
//! Message types exchanged between a [`SourceClient`](crate::SourceClient) and a
//! [`SourceActor`](crate::SourceActor).

use crate::entity::SourceEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Request sent to a source actor.
///
/// The source is read-mostly: a full listing (`List`), a point read (`Get`), and
/// record-specific mutations (`Action`). Records are seeded when the actor is built, so there
/// is no create or delete path.
#[derive(Debug)]
pub enum SourceRequest<T: SourceEntity> {
    List {
        respond_to: Response<Vec<T>>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

/// Operation kinds a [`FaultInjector`](crate::fault::FaultInjector) can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOp {
    List,
    Get,
    Action,
}

impl<T: SourceEntity> SourceRequest<T> {
    /// The operation kind of this request.
    pub fn op(&self) -> SourceOp {
        match self {
            SourceRequest::List { .. } => SourceOp::List,
            SourceRequest::Get { .. } => SourceOp::Get,
            SourceRequest::Action { .. } => SourceOp::Action,
        }
    }
}
