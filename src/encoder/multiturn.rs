//! # Multi-Turn Extension
//!
//! The AMT22 reports a single-turn 14-bit position that wraps from 16383 to
//! 0. [`EncoderState`] watches successive readings for jumps larger than
//! half a turn and counts the wraps, turning the readings into a monotonic
//! multi-turn position.

/// Counts per encoder revolution (2^14)
pub const COUNTS_PER_TURN: u32 = 1 << 14;

/// Half a revolution; a larger jump between readings is a wrap
pub const HALF_TURN: u16 = 1 << 13;

/// Multi-turn bookkeeping for an absolute single-turn encoder.
///
/// Invariant: `position == previous_reading + rotation_count * 2^14` and
/// `rotation_count >= 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderState {
    previous_reading: u16,
    rotation_count: i16,
    position: u32,
}

impl EncoderState {
    /// Fresh state at position zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Last raw 14-bit reading accepted
    pub fn previous_reading(&self) -> u16 {
        self.previous_reading
    }

    /// Completed revolutions, never negative
    pub fn rotation_count(&self) -> i16 {
        self.rotation_count
    }

    /// Extended position in encoder counts
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Forget all history, as after a device zero command
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold a new raw reading into the state and return the extended position
    pub fn update(&mut self, reading: u16) -> u32 {
        let previous = self.previous_reading;

        if previous.abs_diff(reading) > HALF_TURN {
            if reading < HALF_TURN && previous >= HALF_TURN {
                // Passed the top of the range going forward
                self.rotation_count = self.rotation_count.saturating_add(1);
            } else if reading >= HALF_TURN && previous < HALF_TURN {
                // Passed zero going backward
                self.rotation_count = self.rotation_count.saturating_sub(1);
            }
        }

        // A negative turn count has no meaning for the RA axis
        self.rotation_count = self.rotation_count.max(0);

        self.position = reading as u32 + self.rotation_count as u32 * COUNTS_PER_TURN;
        self.previous_reading = reading;
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_moves_do_not_wrap() {
        let mut state = EncoderState::new();
        assert_eq!(state.update(100), 100);
        assert_eq!(state.update(5000), 5000);
        assert_eq!(state.update(8000), 8000);
        assert_eq!(state.rotation_count(), 0);
    }

    #[test]
    fn test_forward_wrap_increments_rotation() {
        let mut state = EncoderState::new();
        state.update(16_000);
        assert_eq!(state.rotation_count(), 0);

        let position = state.update(200);
        assert_eq!(state.rotation_count(), 1);
        assert_eq!(position, 200 + COUNTS_PER_TURN);
        assert_eq!(state.previous_reading(), 200);
    }

    #[test]
    fn test_increasing_sequence_is_monotonic() {
        let mut state = EncoderState::new();
        let mut last = 0;
        let mut raw: u32 = 0;

        // Walk three and a half turns in 3000-count steps
        for step in 0..20u32 {
            raw = (step * 3000) % COUNTS_PER_TURN;
            let position = state.update(raw as u16);
            assert!(position >= last, "step {}: {} < {}", step, position, last);
            assert_eq!(position, step * 3000, "step {}", step);
            assert_eq!(position % COUNTS_PER_TURN, raw);
            last = position;
        }
        assert_eq!(raw, (19 * 3000) % COUNTS_PER_TURN);
        assert_eq!(state.rotation_count() as u32, 19 * 3000 / COUNTS_PER_TURN);
    }

    #[test]
    fn test_backward_wrap_decrements_rotation() {
        let mut state = EncoderState::new();
        for raw in [6000u16, 12_000, 1600, 7600] {
            state.update(raw);
        }
        assert_eq!(state.rotation_count(), 1);

        state.update(1000);
        let position = state.update(15_000);
        assert_eq!(state.rotation_count(), 0);
        assert_eq!(position, 15_000);
    }

    #[test]
    fn test_decreasing_sequence_clamps_at_zero() {
        let mut state = EncoderState::new();

        for raw in [0u16, 13_000, 8000, 3000, 14_000, 9000] {
            let position = state.update(raw);
            assert!(state.rotation_count() >= 0);
            assert_eq!(position, raw as u32);
        }
        assert_eq!(state.rotation_count(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = EncoderState::new();
        state.update(16_000);
        state.update(10);
        assert_ne!(state, EncoderState::new());

        state.reset();
        assert_eq!(state, EncoderState::new());
        assert_eq!(state.position(), 0);
    }

    #[test]
    fn test_exactly_half_turn_is_not_a_wrap() {
        let mut state = EncoderState::new();
        state.update(0);
        state.update(HALF_TURN);
        assert_eq!(state.rotation_count(), 0);
        assert_eq!(state.position(), HALF_TURN as u32);
    }
}
