//! Pure data structures implementing the [`SourceEntity`](fetcher_framework::SourceEntity) trait.

pub mod item;

pub use item::*;
