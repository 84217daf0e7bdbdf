//! Storefront - cart and payment-request service over the inventory backend

use std::sync::Arc;
use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::Config;
use storefront::inventory::HttpInventory;
use storefront::{api, Store};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let inventory = HttpInventory::new(&config.inventory_base_url, config.inventory_timeout)?;
    tracing::info!(base_url = %inventory.base_url(), "Using inventory backend");
    let store = Arc::new(Store::new(inventory));

    let mut events = store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(?event, "Domain event"),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = store.load_products().await {
        tracing::warn!(error = %e, "Initial catalog load failed, starting with an empty catalog");
    }

    let app = api::router(store);
    tracing::info!("Storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
