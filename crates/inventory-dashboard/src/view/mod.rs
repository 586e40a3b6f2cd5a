//! Presentation models derived from the loader phase and the claim states.
//!
//! Nothing here holds state: every model is recomputed from the authoritative read plus the
//! transient claim overlay.

pub mod page;
pub mod row;

pub use page::*;
pub use row::*;
