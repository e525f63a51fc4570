//! # Error Types
//!
//! Custom error types for the mount nodes using `thiserror`.
//!
//! Every error is node-local: nothing here is ever serialised onto the
//! message fabric.

use thiserror::Error;

/// Main error type for the mount nodes
#[derive(Debug, Error)]
pub enum MountError {
    /// A parameter outside its allowed set (fatal at construction)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An encoder response whose parity bits do not match its position bits
    #[error("Encoder parity error: response 0x{response:04X}")]
    Parity {
        /// Raw 16-bit response as received from the encoder
        response: u16,
    },

    /// Malformed or unencodable message frame
    #[error("Message protocol error: {0}")]
    Protocol(String),

    /// Handset field edit buffer could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// GPIO, SPI or PWM failure reported by the HAL
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened at any candidate path
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MountError {
    /// Wrap any `Debug` HAL error as [`MountError::Hardware`].
    pub fn hardware<E: std::fmt::Debug>(context: &str, err: E) -> Self {
        MountError::Hardware(format!("{}: {:?}", context, err))
    }
}

/// Result type alias for the mount nodes
pub type Result<T> = std::result::Result<T, MountError>;
