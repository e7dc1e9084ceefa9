//! Embercast Node -- make a dumb display look like a Chromecast.
//!
//! Usage:
//!   embercast-node                       # Run with default config
//!   embercast-node --config path.toml    # Run with custom config
//!   embercast-node cert                  # Print the generated certificate

use std::path::Path;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;

use embercast_node::bridge::Bridge;
use embercast_node::config::BridgeConfig;
use embercast_protocol::CertBundle;

#[derive(Parser)]
#[command(name = "embercast-node", about = "Chromecast-compatible bridge for non-Cast displays")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "embercast.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default)
    Run,
    /// Print the ephemeral certificate PEM and exit
    Cert,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "embercast_node=info,embercast_display=info,embercast_signaling=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = BridgeConfig::load_or_default(Path::new(&cli.config))?;

    match cli.command {
        Some(Commands::Cert) => {
            let certs = CertBundle::generate()?;
            print!("{}", certs.cert_pem());
        }
        Some(Commands::Run) | None => {
            run_bridge(config).await?;
        }
    }

    Ok(())
}

async fn run_bridge(config: BridgeConfig) -> anyhow::Result<()> {
    tracing::info!("generating ephemeral tls identity");
    let certs = CertBundle::generate()?;

    let (shutdown_tx, _) = broadcast::channel(4);
    let bridge = Bridge::start(&config, &certs, &shutdown_tx).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("ctrl-c received, shutting down");
    let _ = shutdown_tx.send(());
    bridge.join().await;

    Ok(())
}
