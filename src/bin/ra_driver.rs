//! # RA Driver
//!
//! Stepper and encoder node in the middle of the chain. On a host the
//! motor and encoder run against the simulated mount.

use anyhow::Result;
use tracing::info;

use eqmount::config::{Config, NodeRole};
use eqmount::node::{ra_driver, Links};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = eqmount::logging::init(NodeRole::RaDriver);
    info!("EqMount RA driver v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::embedded(NodeRole::RaDriver)?;
    let links = Links::open(&config.serial)?;

    let (axis, encoder) = ra_driver::simulated_hardware(&config)?;
    let node = ra_driver::spawn(&config, links, axis, encoder).await?;

    node.run_until_ctrl_c().await?;
    Ok(())
}
