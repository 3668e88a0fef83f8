use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use elaphure_link_lib::commands::proxy::{self, ProxyManagerState};
use elaphure_link_lib::engine::ElaphureLinkProxy;
use elaphure_link_lib::settings::{keys, MemorySettings};

/// Headless runner for the elaphureLink proxy
#[derive(Debug, Parser)]
#[command(name = "elaphure-link", version, about)]
struct Args {
    /// Device address (host name or IP of the DAP)
    #[arg(short, long)]
    address: String,

    /// Forward vendor-specific DAP commands
    #[arg(long)]
    vendor_command: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = Arc::new(
        MemorySettings::new()
            .with_value(keys::DEVICE_ADDRESS, args.address)
            .with_value(keys::ENABLE_VENDOR_COMMAND, args.vendor_command),
    );
    let state = ProxyManagerState::new(ElaphureLinkProxy, settings.clone())
        .context("failed to spawn proxy session worker")?;

    proxy::setup_status_persistence(state.bus(), settings);
    state.bus().subscribe(|event| match serde_json::to_string(event) {
        Ok(json) => info!("{}: {}", event.event_name(), json),
        Err(e) => error!("Failed to serialize status event: {}", e),
    });

    proxy::start_proxy(&state)
        .await
        .map_err(anyhow::Error::msg)
        .context("failed to start proxy")?;

    let mut status = state.bus().watch_status();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping proxy");
        }
        _ = status.wait_for(|running| !running) => {
            info!("Proxy is no longer running");
        }
    }

    proxy::stop_proxy(&state).await.map_err(anyhow::Error::msg)?;
    state.manager.shutdown().await;
    Ok(())
}
