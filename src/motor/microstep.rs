//! Microstep selection.
//!
//! ```text
//!  ms1  ms2  Steps
//!  ---  ---  -----
//!   H    L   1/2
//!   L    H   1/4
//!   L    L   1/8
//!   H    H   1/16
//! ```

use crate::error::{MountError, Result};

/// Electrical subdivision of one full motor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Microstep {
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl Microstep {
    /// Numeric divisor (2, 4, 8 or 16)
    pub fn value(self) -> u16 {
        match self {
            Microstep::Half => 2,
            Microstep::Quarter => 4,
            Microstep::Eighth => 8,
            Microstep::Sixteenth => 16,
        }
    }

    /// Levels of the (ms1, ms2) select pins, `true` meaning high
    pub fn pin_levels(self) -> (bool, bool) {
        match self {
            Microstep::Half => (true, false),
            Microstep::Quarter => (false, true),
            Microstep::Eighth => (false, false),
            Microstep::Sixteenth => (true, true),
        }
    }

    /// Decode the select pin levels
    pub fn from_pin_levels(ms1: bool, ms2: bool) -> Self {
        match (ms1, ms2) {
            (true, false) => Microstep::Half,
            (false, true) => Microstep::Quarter,
            (false, false) => Microstep::Eighth,
            (true, true) => Microstep::Sixteenth,
        }
    }

    /// Lenient conversion for runtime changes: unknown values select 1/16
    pub fn from_value_or_default(value: u16) -> Self {
        Self::try_from(value).unwrap_or(Microstep::Sixteenth)
    }
}

impl TryFrom<u16> for Microstep {
    type Error = MountError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            2 => Ok(Microstep::Half),
            4 => Ok(Microstep::Quarter),
            8 => Ok(Microstep::Eighth),
            16 => Ok(Microstep::Sixteenth),
            other => Err(MountError::InvalidConfig(format!(
                "microstep must be 2, 4, 8 or 16, got {}",
                other
            ))),
        }
    }
}
