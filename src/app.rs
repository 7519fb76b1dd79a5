use anyhow::{Context, Result};
use lapin::Connection;
use tracing::{error, info};

use crate::config::Config;
use crate::http;
use crate::listener;
use crate::sink::MessageSink;

/// Application context, built once at startup and torn down explicitly
/// on shutdown.
pub struct AppContext {
    config: Config,
    connection: Connection,
}

impl AppContext {
    /// Connect the transport client and assemble the context.
    pub async fn connect(config: Config) -> Result<Self> {
        let connection = listener::connect(&config.amqp.url, &config.service.name).await?;
        Ok(Self { config, connection })
    }

    /// Close the broker connection.
    pub async fn shutdown(self) -> Result<()> {
        self.connection
            .close(200, "shutting down")
            .await
            .context("Failed to close broker connection")?;
        info!("Broker connection closed");
        Ok(())
    }
}

/// Run the service: bind the HTTP listener, register the consumer, and
/// serve both until a shutdown signal arrives or the transport stops.
pub async fn run(context: AppContext) -> Result<()> {
    let http_listener = http::bind(context.config.http.port).await?;

    let channel = context
        .connection
        .create_channel()
        .await
        .context("Failed to open broker channel")?;
    let consumer = listener::register(
        &channel,
        &context.config.amqp.destination,
        &context.config.service.name,
    )
    .await?;

    info!("Service '{}' is running", context.config.service.name);

    tokio::select! {
        result = http::serve(http_listener) => {
            if let Err(e) = result {
                error!("HTTP server stopped: {:#}", e);
            }
        }
        result = listener::run(consumer, MessageSink::stderr()) => {
            if let Err(e) = result {
                error!("Listener stopped: {:#}", e);
            }
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    context.shutdown().await
}
