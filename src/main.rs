// src/main.rs
use std::sync::Arc;

use push_approver::{
    api::{build_router, AppState},
    config::Config,
    keys, ActivationClient, ChallengePoller, DeviceRepository, IntervalTicker,
    JsonFileDeviceStore, ServiceClient,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;
    keys::check_entropy()?;

    let store: Arc<dyn DeviceRepository> = Arc::new(JsonFileDeviceStore::open(&cfg.devices_file).await?);
    let client = ServiceClient::new(&cfg.http)?;

    let poller = ChallengePoller::new(store.clone(), client.clone());
    let ticker = IntervalTicker::new(cfg.poll_interval);
    tokio::spawn(async move { poller.run(ticker).await });

    let app = build_router(AppState {
        store,
        activation: Arc::new(ActivationClient::new(client, cfg.profile.clone())),
    });

    info!("management API listening on {}", cfg.bind_addr);
    let listener = TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
