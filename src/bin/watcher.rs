use anyhow::Result;
use clap::Parser;
use eth_watcher::config::Config;
use eth_watcher::coordinator::{WatchCoordinator, WatchSettings};
use eth_watcher::router::Handlers;
use eth_watcher::rpc::NodeClient;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "watcher")]
#[command(about = "Watch balance events of a deployed contract", long_about = None)]
struct Cli {
    /// Start the historical scan from this block, overriding START_BLOCK.
    #[arg(long)]
    from_block: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    info!("Starting contract event watcher");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("Contract address: {:?}", config.contract_address);
    info!("Node endpoint: {}", config.ws_rpc_url);

    let client = NodeClient::connect(&config.ws_rpc_url).await?;
    info!("Node connection established");

    let handlers = Handlers {
        on_event: Box::new(|event, log| {
            info!(
                "Balance event in tx {:?}: token {} balance {} expiration {}",
                log.transaction_hash, event.tokenId, event.balance, event.expiration
            );
        }),
        on_unrecognized_address: Box::new(|log| {
            warn!("Balance event from unrecognised emitter {}", log.address());
        }),
        on_unrecognized_signature: Box::new(|log| {
            debug!("Not a monitored event: topic0 {:?}", log.topic0());
        }),
    };

    let settings = WatchSettings {
        max_reconnect_attempts: config.max_reconnect_attempts,
        reconnect_base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
    };
    let checkpoint = cli.from_block.or(config.start_block);

    let mut watch = WatchCoordinator::new(
        client,
        config.contract_address,
        checkpoint,
        handlers,
        settings,
    );

    let shutdown = watch.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    if let Err(e) = watch.run().await {
        error!("Watcher error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
