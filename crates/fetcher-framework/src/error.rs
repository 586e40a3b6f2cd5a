//! # Framework Errors
//!
//! This module defines the error types shared by every component of the framework.
//! They are grouped by *scope*, which decides where a failure is allowed to surface:
//!
//! | Error | Kind | Surfaces in |
//! |-------|------|-------------|
//! | [`FrameworkError`] | actor plumbing | the caller of a client method |
//! | [`FetchError`] | transient, expected | the content region (tier 1) |
//! | [`MutationError`] | transient, per entity | the entity's row |
//! | [`RenderError`] | defect | the page boundary (tier 2) |
//!
//! None of them is retried automatically.

/// Errors that can occur within the actor plumbing itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The source refused the call before touching any record.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

/// A read of the data source failed. Recoverable by revalidating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Source(String),
    #[error("Loader closed")]
    Closed,
}

/// A mutation could not be started.
///
/// A commit that fails is not an error of the caller; it settles as
/// [`MutationState::Settled`](crate::MutationState::Settled) with its message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// A mutation for this key is still in flight.
    #[error("A submission is already in flight for {0}")]
    AlreadySubmitting(String),
    /// A precondition of the mutation does not hold.
    #[error("{0}")]
    Rejected(String),
    #[error("Tracker closed")]
    Closed,
}

/// A defect in rendering or transformation code.
///
/// Never produced by an expected fetch failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Render defect: {0}")]
    Defect(String),
    #[error("Render panicked: {0}")]
    Panic(String),
}
