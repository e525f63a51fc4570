//! # AMT22 Absolute Encoder Driver
//!
//! Two-byte SPI exchange with chip-select held low for the whole pair and
//! at least 3 µs of dwell before, between and after the bytes (see the
//! AMT22 datasheet, "SPI timing").
//!
//! | Command  | Byte 1 | Byte 2 |
//! |----------|--------|--------|
//! | Position | `0x00` | `0x00` |
//! | Reset    | `0x00` | `0x60` |
//! | Zero     | `0x00` | `0x70` |

use tracing::{debug, info};

use super::multiturn::EncoderState;
use super::parity::{parity_ok, POSITION_MASK};
use super::AbsoluteEncoder;
use crate::error::{MountError, Result};
use crate::hal::{DelayNs, OutputPin, SpiBus};

/// No-operation byte; also the first byte of every command
pub const AMT22_NOP: u8 = 0x00;

/// Second byte of the reset command
pub const AMT22_RESET: u8 = 0x60;

/// Second byte of the zero command
pub const AMT22_ZERO: u8 = 0x70;

/// Minimum chip-select / inter-byte dwell in microseconds
pub const BYTE_DWELL_US: u32 = 3;

/// Device self-reset window after a zero or reset command
pub const ZERO_SETTLE_MS: u32 = 240;

/// AMT22 on an SPI bus with a dedicated chip-select line
pub struct Amt22<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    state: EncoderState,
    settle_ms: u32,
}

impl<SPI, CS, D> std::fmt::Debug for Amt22<SPI, CS, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Amt22")
            .field("state", &self.state)
            .field("settle_ms", &self.settle_ms)
            .finish_non_exhaustive()
    }
}

impl<SPI, CS, D> Amt22<SPI, CS, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus, chip-select and delay source
    ///
    /// Chip-select is driven high (device not listening).
    ///
    /// # Errors
    ///
    /// Returns `Hardware` if the chip-select pin cannot be driven.
    pub fn new(spi: SPI, mut cs: CS, delay: D) -> Result<Self> {
        cs.set_high()
            .map_err(|e| MountError::hardware("encoder chip-select", e))?;

        Ok(Self {
            spi,
            cs,
            delay,
            state: EncoderState::new(),
            settle_ms: ZERO_SETTLE_MS,
        })
    }

    /// Override the post-zero settle window (never below the device minimum
    /// on real hardware)
    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Multi-turn bookkeeping as of the last good read
    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// Exchange two command bytes for the two response bytes
    fn write_read(&mut self, first: u8, second: u8) -> Result<u16> {
        let mut high = [0u8; 1];
        let mut low = [0u8; 1];

        self.cs
            .set_low()
            .map_err(|e| MountError::hardware("encoder chip-select", e))?;
        self.delay.delay_us(BYTE_DWELL_US);

        self.spi
            .transfer(&mut high, &[first])
            .map_err(|e| MountError::hardware("encoder SPI", e))?;
        self.delay.delay_us(BYTE_DWELL_US);

        self.spi
            .transfer(&mut low, &[second])
            .map_err(|e| MountError::hardware("encoder SPI", e))?;
        self.spi
            .flush()
            .map_err(|e| MountError::hardware("encoder SPI", e))?;
        self.delay.delay_us(BYTE_DWELL_US);

        self.cs
            .set_high()
            .map_err(|e| MountError::hardware("encoder chip-select", e))?;

        Ok(u16::from_be_bytes([high[0], low[0]]))
    }

    /// Issue the device reset command and wait out the reset window
    ///
    /// Multi-turn state is kept: the device comes back at the same absolute
    /// single-turn position.
    pub fn reset(&mut self) -> Result<()> {
        self.write_read(AMT22_NOP, AMT22_RESET)?;
        self.delay.delay_ms(self.settle_ms);
        info!("RA encoder reset");
        Ok(())
    }
}

impl<SPI, CS, D> AbsoluteEncoder for Amt22<SPI, CS, D>
where
    SPI: SpiBus + Send,
    CS: OutputPin + Send,
    D: DelayNs + Send,
{
    fn zero(&mut self) -> Result<()> {
        self.write_read(AMT22_NOP, AMT22_ZERO)?;
        self.state.reset();

        // The device is unresponsive while it re-baselines
        self.delay.delay_ms(self.settle_ms);

        info!("RA encoder zeroed");
        Ok(())
    }

    fn read_position(&mut self) -> Result<u32> {
        let response = self.write_read(AMT22_NOP, AMT22_NOP)?;

        if !parity_ok(response) {
            return Err(MountError::Parity { response });
        }

        let reading = response & POSITION_MASK;
        let position = self.state.update(reading);
        debug!(
            reading,
            rotations = self.state.rotation_count(),
            position,
            "RA encoder read"
        );
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::parity::with_parity;
    use crate::encoder::multiturn::COUNTS_PER_TURN;
    use crate::hal::sim::SimPin;
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    /// SPI bus that replays scripted 16-bit responses and records writes
    #[derive(Clone, Default)]
    struct ScriptedSpi {
        responses: Arc<Mutex<VecDeque<u8>>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl ScriptedSpi {
        fn respond(&self, response: u16) {
            let mut queue = self.responses.lock().unwrap();
            queue.extend(response.to_be_bytes());
        }

        fn written(&self) -> Vec<u8> {
            self.written.lock().unwrap().clone()
        }
    }

    impl embedded_hal::spi::ErrorType for ScriptedSpi {
        type Error = Infallible;
    }

    impl SpiBus for ScriptedSpi {
        fn read(&mut self, words: &mut [u8]) -> std::result::Result<(), Infallible> {
            for word in words.iter_mut() {
                *word = self.responses.lock().unwrap().pop_front().unwrap_or(0);
            }
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> std::result::Result<(), Infallible> {
            self.written.lock().unwrap().extend_from_slice(words);
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> std::result::Result<(), Infallible> {
            self.write(write)?;
            self.read(read)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> std::result::Result<(), Infallible> {
            let copy = words.to_vec();
            self.transfer(words, &copy)
        }

        fn flush(&mut self) -> std::result::Result<(), Infallible> {
            Ok(())
        }
    }

    /// Delay that records the total requested time instead of sleeping
    #[derive(Clone, Default)]
    struct RecordingDelay {
        total_ns: Arc<Mutex<u64>>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            *self.total_ns.lock().unwrap() += ns as u64;
        }
    }

    fn encoder() -> (Amt22<ScriptedSpi, SimPin, RecordingDelay>, ScriptedSpi, SimPin, RecordingDelay) {
        let spi = ScriptedSpi::default();
        let cs = SimPin::new(false);
        let delay = RecordingDelay::default();
        let amt = Amt22::new(spi.clone(), cs.clone(), delay.clone()).unwrap();
        (amt, spi, cs, delay)
    }

    #[test]
    fn test_new_deselects_device() {
        let (_amt, _spi, cs, _delay) = encoder();
        assert!(cs.is_high());
    }

    #[test]
    fn test_read_position_sends_nop_pair() {
        let (mut amt, spi, cs, delay) = encoder();
        spi.respond(with_parity(1234));

        assert_eq!(amt.read_position().unwrap(), 1234);
        assert_eq!(spi.written(), vec![AMT22_NOP, AMT22_NOP]);
        assert!(cs.is_high(), "chip-select must be released after the pair");
        // Three dwells of 3 µs
        assert_eq!(*delay.total_ns.lock().unwrap(), 9_000);
    }

    #[test]
    fn test_parity_error_leaves_state_untouched() {
        let (mut amt, spi, _cs, _delay) = encoder();
        spi.respond(with_parity(16_000));
        amt.read_position().unwrap();
        let before = *amt.state();

        spi.respond(with_parity(100) ^ 0x0001);
        match amt.read_position() {
            Err(MountError::Parity { response }) => {
                assert_eq!(response, with_parity(100) ^ 0x0001);
            }
            other => panic!("Expected parity error, got: {:?}", other),
        }
        assert_eq!(*amt.state(), before);
    }

    #[test]
    fn test_reads_extend_across_wrap() {
        let (mut amt, spi, _cs, _delay) = encoder();
        for raw in [15_000u16, 16_300, 50] {
            spi.respond(with_parity(raw));
        }

        amt.read_position().unwrap();
        amt.read_position().unwrap();
        assert_eq!(amt.read_position().unwrap(), 50 + COUNTS_PER_TURN);
    }

    #[test]
    fn test_zero_sends_command_resets_and_waits() {
        let (mut amt, spi, _cs, delay) = encoder();
        spi.respond(with_parity(16_000));
        spi.respond(with_parity(20));
        amt.read_position().unwrap();
        amt.read_position().unwrap();
        assert_eq!(amt.state().rotation_count(), 1);

        *delay.total_ns.lock().unwrap() = 0;
        spi.respond(0);
        amt.zero().unwrap();

        assert_eq!(*amt.state(), EncoderState::new());
        let written = spi.written();
        assert_eq!(&written[written.len() - 2..], &[AMT22_NOP, AMT22_ZERO]);
        let waited_ns = *delay.total_ns.lock().unwrap();
        assert!(waited_ns >= ZERO_SETTLE_MS as u64 * 1_000_000);
    }

    #[test]
    fn test_reset_sends_reset_command() {
        let (mut amt, spi, _cs, _delay) = encoder();
        spi.respond(0);
        amt.reset().unwrap();
        assert_eq!(spi.written(), vec![AMT22_NOP, AMT22_RESET]);
    }
}
