use crate::clients::{ClaimClient, InventoryClient};
use crate::config::DashboardConfig;
use crate::inventory_actor;
use crate::model::{ClaimState, Item, ItemId};
use crate::view::{render_dashboard, InventoryTable};
use fetcher_framework::{
    FaultInjector, FetchError, FetchPhase, LoaderClient, LoaderController, MutationError,
    MutationTracker, Page, SourceActor, SourceClient, TrackerContext,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Phase of the inventory read.
pub type InventoryPhase = FetchPhase<Vec<Item>>;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("Actor task failed: {0}")]
    TaskFailed(String),
}

/// The runtime orchestrator of one dashboard session.
///
/// `DashboardSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping the source, loader and tracker
/// - **Dependency Wiring**: The loader reads through the inventory client; the tracker claims
///   through it and revalidates the loader after every claim
///
/// # Architecture
///
/// - **Inventory Actor**: the simulated service, with faults and latency from the config
/// - **Loader**: the inventory read and its retry contract
/// - **Tracker**: one claim per item at a time, shared by every view of that item
///
/// # Example
///
/// ```ignore
/// let system = DashboardSystem::new(&config);
///
/// system.mount().await?;
/// system.begin_claim("widget").await?;
/// let page = system.render().await?;
///
/// system.shutdown().await?;
/// ```
pub struct DashboardSystem {
    pub inventory_client: InventoryClient,
    pub loader: LoaderClient<InventoryClient>,
    pub claim_client: ClaimClient,

    /// Task handles in shutdown order
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl DashboardSystem {
    /// Creates and starts a session against a source that fails at the configured rates.
    pub fn new(config: &DashboardConfig) -> Self {
        let (actor, source) = inventory_actor::new(config);
        Self::start(config, actor, source)
    }

    /// Like [`new`](Self::new), with `faults` replacing the configured failure rates.
    pub fn with_faults(config: &DashboardConfig, faults: impl FaultInjector) -> Self {
        let (actor, source) = inventory_actor::new(config);
        Self::start(config, actor.with_faults(faults), source)
    }

    fn start(
        config: &DashboardConfig,
        actor: SourceActor<Item>,
        source: SourceClient<Item>,
    ) -> Self {
        // 1. Create actors (no dependencies)
        let inventory_client = InventoryClient::new(source);
        let (loader, loader_client) = LoaderController::new(config.buffer_size);
        let (tracker, tracker_client) = MutationTracker::new(config.buffer_size);

        // 2. Start actors with injected context
        let source_handle = tokio::spawn(actor.run(()));
        let loader_handle = tokio::spawn(loader.run(inventory_client.clone()));
        // Tracker claims through the source and refreshes the loader after each claim
        let tracker_handle = tokio::spawn(tracker.run(
            TrackerContext::new(inventory_client.clone()).with_revalidator(loader_client.clone()),
        ));

        Self {
            inventory_client,
            claim_client: ClaimClient::new(tracker_client, loader_client.clone()),
            loader: loader_client,
            handles: vec![
                ("tracker", tracker_handle),
                ("loader", loader_handle),
                ("source", source_handle),
            ],
        }
    }

    /// The initial read of the page.
    pub async fn mount(&self) -> Result<InventoryPhase, SystemError> {
        Ok(self.loader.load().await?)
    }

    /// The retry control of the table region.
    pub async fn revalidate(&self) -> Result<InventoryPhase, SystemError> {
        Ok(self.loader.revalidate().await?)
    }

    pub async fn current_phase(&self) -> Result<InventoryPhase, SystemError> {
        Ok(self.loader.current_phase().await?)
    }

    pub async fn begin_claim(&self, id: impl Into<ItemId>) -> Result<(), SystemError> {
        Ok(self.claim_client.begin_claim(id.into()).await?)
    }

    pub async fn observe(&self, id: impl Into<ItemId>) -> Result<ClaimState, SystemError> {
        Ok(self.claim_client.observe(id.into()).await?)
    }

    /// Clears settled claims. Claims in flight are kept.
    pub async fn navigate_away(&self) -> Result<usize, SystemError> {
        Ok(self.claim_client.navigate_away().await?)
    }

    /// Renders the page from the current read and claim states.
    pub async fn render(&self) -> Result<Page<InventoryTable>, SystemError> {
        let phase = self.loader.current_phase().await?;
        let last_loaded = self.loader.last_loaded().await?;
        let claims = self.claim_client.claims().await?;
        Ok(render_dashboard(&phase, last_loaded.as_ref(), &claims))
    }

    /// Gracefully shuts down the session.
    ///
    /// Dropping the clients closes every channel. The tracker goes first: its context holds the
    /// last loader and source clients, so the loader and then the source exit after it.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down dashboard...");

        let Self {
            inventory_client,
            loader,
            claim_client,
            handles,
        } = self;
        drop(claim_client);
        drop(loader);
        drop(inventory_client);

        for (actor, handle) in handles {
            if let Err(e) = handle.await {
                error!(actor, error = %e, "Actor task failed");
                return Err(SystemError::TaskFailed(format!("{actor}: {e}")));
            }
        }

        info!("Dashboard shutdown complete.");
        Ok(())
    }
}
