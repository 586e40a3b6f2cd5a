//! # Inventory Dashboard
//!
//! Simulates one session of the inventory page against an unreliable service.
//!
//! ## Core Components
//!
//! - **model**: [`Item`](inventory_dashboard::model::Item) and the claim payload.
//! - **inventory_actor**: the simulated service, failing and lagging per the config.
//! - **clients**: [`InventoryClient`](inventory_dashboard::clients::InventoryClient) and
//!   [`ClaimClient`](inventory_dashboard::clients::ClaimClient).
//! - **lifecycle**: [`DashboardSystem`] wiring the actors together.
//!
//! ## Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -- --seed 7
//! INVENTORY_FETCH_FAILURE_RATE=0.9 RUST_LOG=info cargo run
//! ```
//!
//! The session mounts the page, retries the read while it fails (as a user pressing the
//! retry control would, up to `--max-attempts` times), then claims one unit of every item and
//! prints the rendered table.

use clap::Parser;
use fetcher_framework::{FetchPhase, Page, Region};
use inventory_dashboard::config::DashboardConfig;
use inventory_dashboard::lifecycle::{setup_tracing, DashboardSystem, SystemError};
use inventory_dashboard::model::ItemId;
use std::path::PathBuf;
use tracing::{error, info, warn, Instrument};

#[derive(Debug, Parser)]
#[command(name = "inventory-dashboard", version, about = "Simulated inventory dashboard session")]
struct Cli {
    #[command(flatten)]
    config: DashboardConfig,

    /// Read settings from a JSON file instead of flags.
    #[arg(long, env = "INVENTORY_CONFIG")]
    config_file: Option<PathBuf>,

    /// Print the final page as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let cli = Cli::parse();
    let config = match &cli.config_file {
        Some(path) => DashboardConfig::from_json_file(path)?,
        None => {
            cli.config.validate()?;
            cli.config.clone()
        }
    };
    info!(?config, "Starting dashboard session");

    let system = DashboardSystem::new(&config);

    let loaded = async { mount_with_retries(&system, config.max_attempts).await }
        .instrument(tracing::info_span!("mount"))
        .await?;

    if !loaded {
        warn!(attempts = config.max_attempts, "Inventory never loaded, giving up");
        system.shutdown().await?;
        return Ok(());
    }

    let ids: Vec<ItemId> = match system.current_phase().await? {
        FetchPhase::Loaded(items) => items.into_iter().map(|item| item.id).collect(),
        _ => Vec::new(),
    };

    let span = tracing::info_span!("claims");
    async {
        for id in &ids {
            match system.begin_claim(id.clone()).await {
                Ok(()) => info!(item_id = %id, "Claim submitted"),
                Err(e) => warn!(item_id = %id, error = %e, "Claim refused"),
            }
        }
        print_page(&system, cli.json).await?;

        for id in &ids {
            if let Err(e) = system.claim_client.wait_settled(id.clone()).await {
                error!(item_id = %id, error = %e, "Claim lost");
            }
        }
        Ok::<_, SystemError>(())
    }
    .instrument(span)
    .await?;

    // The revalidation after each claim may itself fail; the user retries the same way.
    mount_with_retries(&system, config.max_attempts).await?;
    print_page(&system, cli.json).await?;

    system.shutdown().await?;
    info!("Session completed");
    Ok(())
}

/// Loads the inventory, pressing "retry" while the read fails.
async fn mount_with_retries(
    system: &DashboardSystem,
    max_attempts: u32,
) -> Result<bool, SystemError> {
    let mut phase = system.mount().await?;
    let mut attempt = 1;
    while let FetchPhase::Failed(message) = &phase {
        if attempt >= max_attempts {
            return Ok(false);
        }
        warn!(attempt, %message, "Load failed, retrying");
        phase = system.revalidate().await?;
        attempt += 1;
    }
    Ok(phase.is_loaded())
}

async fn print_page(system: &DashboardSystem, json: bool) -> Result<(), SystemError> {
    let page = system.render().await?;
    if json {
        match serde_json::to_string_pretty(&page_json(&page)) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => error!(error = %e, "Could not serialize page"),
        }
        return Ok(());
    }

    match &page {
        Page::Rendered { chrome, body } => {
            println!("== {} ==", chrome.title);
            match body {
                Region::Pending => println!("  loading..."),
                Region::Failed(failure) => println!("  {} [retry]", failure.message),
                Region::Ready(table) => {
                    for row in &table.rows {
                        let marker = if row.pending { " (claiming)" } else { "" };
                        let error = row.inline_error.as_deref().unwrap_or("");
                        println!("  {:<10} {:>3}{} {}", row.name, row.stock, marker, error);
                    }
                    if table.refreshing {
                        println!("  (refreshing)");
                    }
                }
            }
        }
        Page::Recovery(view) => println!("Something went wrong: {} [reload]", view.message),
    }
    Ok(())
}

fn page_json(page: &Page<inventory_dashboard::view::InventoryTable>) -> serde_json::Value {
    match page {
        Page::Rendered { chrome, body } => serde_json::json!({
            "title": chrome.title,
            "table": body.content(),
            "error": body.failure().map(|f| f.message.clone()),
        }),
        Page::Recovery(view) => serde_json::json!({ "recovery": view.message }),
    }
}
