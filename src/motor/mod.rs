//! # RA Motor Control
//!
//! Drives the RA stepper through a STEP/DIR/ENABLE stepstick driver.
//!
//! This module handles:
//! - Validating the mechanical configuration (steps, ratios, microstep)
//! - Microstep selection over two select pins
//! - Turning an angular rate into a hardware PWM period
//! - Polling the absolute encoder in the background

pub mod driver;
pub mod microstep;
pub mod monitor;

pub use driver::{Motor, MotorPins};
pub use microstep::Microstep;
pub use monitor::RaTelemetry;

use serde::Deserialize;

use crate::error::{MountError, Result};
use crate::msg::protocol::{Direction, Tracking};

/// Length of a sidereal day in seconds
pub const SIDEREAL_DAY_SECONDS: f64 = 86_164.1;

/// Mechanical description of the RA drive train
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    /// Full steps per motor revolution (200 for 1.8°, 400 for 0.9°)
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u32,

    /// Highest step rate the motor accepts
    #[serde(default = "default_max_hz")]
    pub max_hz: u32,

    /// Worm gear ratio, e.g. 144 for 144:1
    #[serde(default = "default_worm_ratio")]
    pub worm_ratio: u32,

    /// Combined ratio of all gears between motor and worm (1 if none)
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: u32,

    /// Microstep setting: 2, 4, 8 or 16
    #[serde(default = "default_microstep")]
    pub microstep: u16,
}

fn default_steps_per_revolution() -> u32 { 400 }
fn default_max_hz() -> u32 { 1000 }
fn default_worm_ratio() -> u32 { 144 }
fn default_gear_ratio() -> u32 { 3 }
fn default_microstep() -> u16 { 16 }

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            steps_per_revolution: default_steps_per_revolution(),
            max_hz: default_max_hz(),
            worm_ratio: default_worm_ratio(),
            gear_ratio: default_gear_ratio(),
            microstep: default_microstep(),
        }
    }
}

impl MotorConfig {
    /// Check every parameter against its allowed set
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.steps_per_revolution == 0 {
            return Err(MountError::InvalidConfig(
                "steps_per_revolution must be greater than 0, typical values are 200 or 400".to_string(),
            ));
        }

        if self.max_hz == 0 {
            return Err(MountError::InvalidConfig(
                "max_hz must be greater than 0".to_string(),
            ));
        }

        if self.worm_ratio < 1 {
            return Err(MountError::InvalidConfig(
                "worm_ratio must be at least 1, use 1 if not using a worm gear".to_string(),
            ));
        }

        if self.gear_ratio < 1 {
            return Err(MountError::InvalidConfig(
                "gear_ratio must be at least 1, use 1 if not using a gearbox".to_string(),
            ));
        }

        Microstep::try_from(self.microstep)?;
        Ok(())
    }

    /// Microsteps per revolution of the RA axis at the given microstep setting
    pub fn system_ratio(&self, microstep: Microstep) -> f64 {
        self.steps_per_revolution as f64
            * microstep.value() as f64
            * self.worm_ratio as f64
            * self.gear_ratio as f64
    }

    /// Step rate that turns the RA axis once per sidereal day
    pub fn sidereal_hz(&self, microstep: Microstep) -> f64 {
        self.system_ratio(microstep) / SIDEREAL_DAY_SECONDS
    }
}

/// PWM period in nanoseconds for a step rate
pub fn period_ns(hz: f64) -> u64 {
    (1e9 / hz).round() as u64
}

/// The RA axis as seen by the node glue: configured once, then commanded
/// and queried by independent tasks.
pub trait RaAxis: Send {
    /// Bring pins and PWM into their power-on state (tracking off)
    fn configure(&mut self) -> Result<()>;

    /// Command the sidereal rate and return it in Hz
    fn run_at_sidereal_rate(&mut self) -> Result<f64>;

    /// Energise or release the motor
    fn set_tracking(&mut self, tracking: Tracking) -> Result<()>;

    /// Select the direction of rotation
    fn set_direction(&mut self, direction: Direction) -> Result<()>;

    /// Tracking state, read back from the enable pin
    fn tracking(&mut self) -> Result<Tracking>;

    /// Direction, read back from the direction pin
    fn direction(&mut self) -> Result<Direction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MotorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_sidereal_rate_for_reference_mount() {
        let config = MotorConfig {
            steps_per_revolution: 400,
            max_hz: 1000,
            worm_ratio: 144,
            gear_ratio: 3,
            microstep: 16,
        };

        assert_eq!(config.system_ratio(Microstep::Sixteenth), 2_764_800.0);
        let hz = config.sidereal_hz(Microstep::Sixteenth);
        assert!((hz - 32.087).abs() < 0.01, "sidereal hz was {}", hz);
    }

    #[test]
    fn test_period_is_rounded_reciprocal() {
        assert_eq!(period_ns(1000.0), 1_000_000);
        assert_eq!(period_ns(3.0), 333_333_333);

        let hz = MotorConfig::default().sidereal_hz(Microstep::Sixteenth);
        let expected = 1e9 / hz;
        assert!((period_ns(hz) as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = MotorConfig { steps_per_revolution: 0, ..MotorConfig::default() };
        assert!(matches!(config.validate(), Err(MountError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_max_hz_rejected() {
        let config = MotorConfig { max_hz: 0, ..MotorConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ratios_rejected() {
        let worm = MotorConfig { worm_ratio: 0, ..MotorConfig::default() };
        let gear = MotorConfig { gear_ratio: 0, ..MotorConfig::default() };
        assert!(worm.validate().is_err());
        assert!(gear.validate().is_err());
    }

    #[test]
    fn test_unsupported_microstep_rejected() {
        for microstep in [0u16, 1, 3, 32] {
            let config = MotorConfig { microstep, ..MotorConfig::default() };
            assert!(config.validate().is_err(), "microstep {} accepted", microstep);
        }
    }
}
