//! # Handset
//!
//! Keypad and menu node at the head of the chain. On a host, key names
//! typed on stdin (one per line) stand in for the keypad.

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use eqmount::config::{Config, NodeRole};
use eqmount::hal::sim::LogDisplay;
use eqmount::node::{handset, Links};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = eqmount::logging::init(NodeRole::Handset);
    info!("EqMount handset v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::embedded(NodeRole::Handset)?;
    let links = Links::open(&config.serial)?;

    let keys = BufReader::new(tokio::io::stdin());
    let node = handset::spawn(&config, links, keys, LogDisplay::new("handset"))?;

    node.run_until_ctrl_c().await?;
    Ok(())
}
