//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Actor Lifecycle**: startup and shutdown of the source, loader and tracker
//! - **Reads**: every load attempt and its outcome (`attempt`, `error`)
//! - **Claims**: `Submitting`, `Settled`, and the revalidation that follows (`key`, `attempt`)
//! - **Injected faults**: at `warn`, with the operation that failed
//!
//! ## Usage Examples
//!
//! ```bash
//! # Compact logs
//! RUST_LOG=info cargo run
//!
//! # Every request, with payloads
//! RUST_LOG=debug cargo run
//!
//! # Only the claim tracker
//! RUST_LOG=fetcher_framework::tracker=debug cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! A claim on `widget` that succeeds, with `RUST_LOG=info`:
//!
//! ```text
//! INFO begin_claim: Submitting key=widget attempt=1 request=ClaimRequest { item_id: ItemId("widget") }
//! INFO begin_claim: Claim started item_id=widget
//! INFO Action ok entity_type="Item" id=widget
//! INFO Settled ok key=widget attempt=1
//! INFO Loading attempt=2
//! INFO Loaded attempt=2
//! ```

/// Initializes the global subscriber. Call once, from `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // entity_type / key fields identify the source
        .compact()
        .init();
}
