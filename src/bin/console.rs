//! # Console
//!
//! Monitor at the tail of the chain: prints every message it receives.
//! Filter key numbers `0` to `3` typed on stdin switch the filter.

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use eqmount::config::{Config, NodeRole};
use eqmount::hal::sim::LogDisplay;
use eqmount::node::{console, Links};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = eqmount::logging::init(NodeRole::Console);
    info!("EqMount console v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::embedded(NodeRole::Console)?;
    let links = Links::open(&config.serial)?;

    let filter_keys = BufReader::new(tokio::io::stdin());
    let node = console::spawn(&config, links, filter_keys, LogDisplay::new("console"))?;

    node.run_until_ctrl_c().await?;
    Ok(())
}
