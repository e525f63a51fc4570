//! Log output setup shared by the node binaries.

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::NodeRole;

/// Install the global subscriber for `role`
///
/// `RUST_LOG` refines the filter; INFO is always enabled. Log lines go
/// through a background writer, so keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(role: NodeRole) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(writer)
        .with_target(false)
        .init();

    tracing::info!(node = %role, "Logging initialised");
    guard
}
