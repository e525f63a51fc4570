//! # Serial Links
//!
//! Each node has up to two UART links, upstream and downstream, wired as
//! a conga line: `Handset <-> RADriver <-> Console`.
//!
//! This module handles:
//! - Opening a UART at 8-N-1 with the configured baud rate
//! - Splitting it into a byte source for the frame decoder and a
//!   [`SerialPortIO`] writer for publishing and relaying

pub mod port_trait;

pub use port_trait::{SerialPortIO, StreamPort, TokioSerialPort};

use tokio::io::ReadHalf;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::error::{MountError, Result};

/// Default link speed
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Link rates accepted by the configuration
pub const STANDARD_BAUD_RATES: &[u32] = &[9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600];

/// Which neighbour a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    Upstream,
    Downstream,
}

impl LinkSide {
    pub fn opposite(self) -> Self {
        match self {
            LinkSide::Upstream => LinkSide::Downstream,
            LinkSide::Downstream => LinkSide::Upstream,
        }
    }
}

impl std::fmt::Display for LinkSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkSide::Upstream => f.write_str("upstream"),
            LinkSide::Downstream => f.write_str("downstream"),
        }
    }
}

/// An opened UART split into its two halves
pub struct SerialLink {
    pub reader: ReadHalf<tokio_serial::SerialStream>,
    pub writer: TokioSerialPort,
    device_path: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Open a UART for frame traffic
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the device cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eqmount::serial::SerialLink;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let link = SerialLink::open("/dev/ttyUSB0", 115_200)?;
    ///     println!("Linked via {}", link.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!("Opening serial link {} at {} baud", path, baud_rate);

        let port = open_port(path, baud_rate)
            .map_err(|e| MountError::SerialPortNotFound(format!("{} ({})", path, e)))?;
        let (reader, writer) = tokio::io::split(port);

        info!("Serial link open at {}", path);
        Ok(Self {
            reader,
            writer: TokioSerialPort::new(writer),
            device_path: path.to_string(),
        })
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Open a specific serial port at 8-N-1
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| MountError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_baud_is_standard() {
        assert!(STANDARD_BAUD_RATES.contains(&DEFAULT_BAUD_RATE));
    }

    #[test]
    fn test_link_side_opposite() {
        assert_eq!(LinkSide::Upstream.opposite(), LinkSide::Downstream);
        assert_eq!(LinkSide::Downstream.opposite(), LinkSide::Upstream);
        assert_eq!(LinkSide::Upstream.to_string(), "upstream");
    }

    #[tokio::test]
    async fn test_open_port_with_invalid_path_returns_error() {
        let result = open_port("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE);

        match result {
            Err(MountError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_open_link_with_invalid_path_returns_not_found() {
        let result = SerialLink::open("/dev/nonexistent0", DEFAULT_BAUD_RATE);

        match result {
            Err(MountError::SerialPortNotFound(msg)) => {
                assert!(msg.contains("/dev/nonexistent0"));
            }
            other => panic!("Expected SerialPortNotFound, got: {:?}", other.map(|_| ())),
        }
    }

    // Only runs with a loopback adapter attached
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_open_with_real_hardware() {
        match SerialLink::open("/dev/ttyUSB0", DEFAULT_BAUD_RATE) {
            Ok(link) => assert_eq!(link.device_path(), "/dev/ttyUSB0"),
            Err(e) => println!("No serial hardware detected ({})", e),
        }
    }
}
