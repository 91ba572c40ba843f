#![forbid(unsafe_code)]
//! HTTP server for the GenAuth ledger

use std::sync::Arc;
use genauth::api::{run_api_server, Node};
use genauth::cli::{init_tracing, open_ledger};
use genauth::config::load_config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config()?;
    let ledger = open_ledger(&config.ledger)?;
    info!(
        chain_file = %config.ledger.chain_file,
        blocks = ledger.get_chain().len(),
        difficulty = ledger.difficulty(),
        "Starting GenAuth server"
    );

    let node = Arc::new(Node::new(ledger));
    run_api_server(node, &config.api).await?;
    Ok(())
}
