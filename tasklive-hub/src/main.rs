//! `TaskLive` event hub -- topic fan-out server for live task updates.
//!
//! An axum WebSocket server that groups clients by topic and forwards
//! published task events to the other members of each topic.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:5100
//! cargo run --bin tasklive-hub
//!
//! # Run on custom address
//! cargo run --bin tasklive-hub -- --bind 127.0.0.1:8080
//!
//! # Or via environment variable
//! TASKLIVE_HUB_ADDR=127.0.0.1:8080 cargo run --bin tasklive-hub
//! ```

use std::sync::Arc;

use clap::Parser;
use tasklive_hub::config::{HubCliArgs, HubConfig};
use tasklive_hub::hub::{self, HubState};

#[tokio::main]
async fn main() {
    let cli = HubCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match HubConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting tasklive hub");

    let state = Arc::new(HubState::new());

    match hub::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "hub listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "hub server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start hub");
            std::process::exit(1);
        }
    }
}
