#![forbid(unsafe_code)]
//! StarChain API server

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use starchain::api::{run_api_server, Node};
use starchain::blockchain::Ledger;
use starchain::clock::SystemTimeSource;
use starchain::config::{load_config, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "starchain-server", version, about = "Serve the StarChain star registry over HTTP")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.api.port = port;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.logging.tracing_level()?)
        .init();

    let ledger = Ledger::bootstrap(Arc::new(SystemTimeSource))?;
    tracing::info!(height = ledger.height(), "ledger initialized");

    let node = Arc::new(Node::new(Arc::new(ledger)));
    run_api_server(node, &config.api).await
}
