mod server;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use docent_api::signaling::{ConnectionRegistry, RoomGroups, SignalingHub, StreamBindings};
use docent_core::{
    bootstrap::{init_services, load_config},
    logging,
};
use docent_sfu::SfuConfig;

use server::DocentServer;

#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(about = "Docent signaling relay", long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(long, short = 'c', env = "DOCENT_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Docent signaling relay starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Upstream SFU: {}", config.sfu.url);

    // 3. Initialize services
    let services = init_services(&config)?;

    // 4. Signaling hub, one upstream link per client connection
    let hub = Arc::new(SignalingHub::new(
        services.room_service.clone(),
        SfuConfig {
            url: config.sfu.url.clone(),
            max_message_size: config.sfu.max_message_size,
        },
        ConnectionRegistry::new(),
        RoomGroups::new(),
        StreamBindings::new(),
    ));
    info!("Signaling hub initialized");

    // 5. Serve until a shutdown signal arrives
    DocentServer::new(config, services, hub).start().await
}
