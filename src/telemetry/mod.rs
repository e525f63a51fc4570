//! # Telemetry
//!
//! This module handles:
//! - Broadcasting RA state on the fabric at a fixed cadence ([`publisher`])
//! - Mirroring received traffic to a JSONL file ([`traffic_log`])

pub mod publisher;
pub mod traffic_log;

pub use publisher::{broadcast_ra_state, snapshot};
pub use traffic_log::TrafficLog;
