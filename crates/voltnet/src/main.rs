use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use volt_core::{NetworkConfig, NetworkState};

/// Command line arguments for the voltnet server
#[derive(Parser, Debug)]
#[command(name = "voltnet")]
#[command(about = "VoltNet charging network server")]
struct Args {
    /// Path to the network configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().pretty().init();

    let config = match &args.config {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
            serde_json::from_str::<NetworkConfig>(&content)
                .with_context(|| format!("Failed to parse config file '{}'", path.display()))?
        }
        None => NetworkConfig::default(),
    };

    tracing::info!(
        "Seeding {} stations, suggestion radius {}",
        config.stations.len(),
        config.max_radius
    );
    let state = NetworkState::new(config);

    let bind_addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    voltnet::serve(listener, state).await.context("Server error")?;

    Ok(())
}
