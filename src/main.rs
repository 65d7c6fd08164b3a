//! Voidrunner server entry point: loads configuration, binds the reliable
//! channel, and runs the dispatcher until a terminal interrupt arrives.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voidrunner_server::bridge::SessionBridge;
use voidrunner_server::config::AppConfig;
use voidrunner_server::dispatcher::Dispatcher;
use voidrunner_server::shutdown::{listen_for_interrupt, Shutdown};
use voidrunner_server::transport::reliable::ReliableTransport;

/// Command-line arguments for the Voidrunner server.
#[derive(Debug, Parser)]
#[command(name = "voidrunner-server", about = "Authoritative Voidrunner game server")]
struct Args {
    /// Port the reliable (lobby/matchmaking) channel listens on. Falls back
    /// to the configuration file's `server.reliable_port` if omitted.
    port: Option<u16>,

    /// Path to a TOML configuration file overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.reliable_port = port;
    }

    let (shutdown, shutdown_watch) = Shutdown::new();
    tokio::spawn(listen_for_interrupt(shutdown.clone()));

    let (transport, events) = ReliableTransport::bind(config.server.reliable_port).await?;
    let transport = Arc::new(transport);

    let bridge = SessionBridge::new(config.gameplay.clone(), config.dt(), shutdown_watch.clone());
    let dispatcher = Dispatcher::new(transport, bridge, config.server.server_id, config.server.server_ip);

    tracing::info!(port = config.server.reliable_port, "voidrunner server started");
    dispatcher.run(events, shutdown_watch).await;

    tracing::info!("voidrunner server stopped");
    Ok(())
}
