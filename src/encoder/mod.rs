//! # RA Absolute Encoder
//!
//! Absolute-position tracking for the RA axis.
//!
//! This module handles:
//! - The AMT22 two-byte SPI exchange and its command set
//! - Validating the two check bits of each response
//! - Extending the wrapping 14-bit reading into a multi-turn position

pub mod amt22;
pub mod multiturn;
pub mod parity;

pub use amt22::Amt22;
pub use multiturn::EncoderState;

use crate::error::Result;

/// An absolute encoder that can be re-baselined and polled
pub trait AbsoluteEncoder: Send {
    /// Command the device to re-baseline and reset the multi-turn state
    fn zero(&mut self) -> Result<()>;

    /// Read the current extended position
    ///
    /// # Errors
    ///
    /// Returns `Parity` without touching the multi-turn state when the
    /// response check bits are wrong.
    fn read_position(&mut self) -> Result<u32>;
}
