//! Relays `DepositInitiated` events from a source chain.
//!
//! ```text
//! RUST_LOG=bridge_listener=info cargo run --example relay_deposits -- listener.json
//! ```
//!
//! `listener.json` only needs the fields that differ from the defaults, e.g.
//!
//! ```json
//! {
//!   "source_endpoint": "https://ethereum-sepolia-rpc.publicnode.com",
//!   "destination_endpoint": "https://rpc-amoy.polygon.technology",
//!   "destination_chain_id": 80002,
//!   "contract_address": "0x7b79995e5f793a07bc00c21412e50eaae098e7f9",
//!   "max_chunk_size": 500,
//!   "poll_interval_ms": 12000
//! }
//! ```

use std::time::Duration;

use bridge_listener::{
    DepositDecoder, FileStateStore, ListenerConfig, LoggingDispatcher, ScanSchedulerBuilder,
    ledger::{RobustProvider, RobustProviderBuilder},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "listener.json".to_string());
    let config = ListenerConfig::from_json_file(&config_path)?;
    config.validate()?;

    let reader: RobustProvider = RobustProviderBuilder::new(config.source_endpoint.clone())
        .fallbacks(config.fallback_endpoints.clone())
        .call_timeout(Duration::from_secs(30))
        .max_retries(5)
        .min_delay(Duration::from_millis(500))
        .build()
        .await?;

    let store = FileStateStore::new(config.state_path.clone());
    let dispatcher = LoggingDispatcher::new(config.destination_chain_id);
    let mut scheduler =
        ScanSchedulerBuilder::from_config(config).build(reader, DepositDecoder, store, dispatcher)?;

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        ctrl_c.cancel();
    });

    if let Err(e) = scheduler.run(token).await {
        error!("Listener stopped: {e}");
        return Err(e.into());
    }
    info!(last_processed_block = ?scheduler.last_processed_block(), "Listener stopped");
    Ok(())
}
