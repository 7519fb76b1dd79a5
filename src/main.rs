mod app;
mod config;
mod http;
mod listener;
mod message;
mod sink;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppContext;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; diagnostics go to stderr alongside the sink output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("  Service: {}", config.service.name);
    info!("  Destination: {}", config.amqp.destination);
    info!("  Broker: {}", config.amqp.url);

    // Connect the transport and run until shutdown
    let context = AppContext::connect(config).await?;
    app::run(context).await
}
