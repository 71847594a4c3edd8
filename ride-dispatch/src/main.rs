use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ride_dispatch::{
    api::AppState,
    cli::Cli,
    dispatch::Dispatcher,
    driver::DriverRegistry,
    providers::{Geocoder, RouteProvider},
    refresher::LocationRefresher,
    server::Server,
};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let registry = match &cli.roster {
        Some(path) => DriverRegistry::from_json_file(path)?,
        None => DriverRegistry::demo(),
    };
    info!(drivers = registry.drivers().len(), "driver roster loaded");
    let dispatcher = Arc::new(Dispatcher::new(registry));

    let client = reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .context("failed to build http client")?;
    let state = AppState::new(
        Arc::clone(&dispatcher),
        Geocoder::new(client.clone(), &cli.geocoder_url, &cli.user_agent),
        RouteProvider::new(client, &cli.router_url),
    );

    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let server = Server::new(listener, state);
    info!("dispatch service listening on {}", server.local_addr()?);

    let refresher = LocationRefresher::new(
        Arc::clone(&dispatcher),
        cli.jitter_interval(),
        cli.jitter_max_offset,
    )
    .spawn();

    let result = server.run_until_ctrl_c().await;
    refresher.stop().await;
    if let Err(err) = &result {
        warn!("server exited with error: {err:?}");
    }
    result
}
