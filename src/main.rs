use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use search_aggregator::api::{AppState, create_router};
use search_aggregator::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Search aggregator backend")]
struct Cli {
    /// Address to listen on; overrides BIND_ADDR.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let bind_addr = cli.bind.unwrap_or(config.bind_addr);

    let state = AppState::from_config(&config).context("failed to build HTTP client")?;
    let app = create_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, origins = ?config.cors_origins, "search aggregator listening");

    axum::serve(listener, app).await?;
    Ok(())
}
