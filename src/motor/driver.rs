//! # RA Stepper Driver
//!
//! Based on an A4988/TMC2208-style stepstick. The STEP input is fed by a
//! hardware PWM generator at 50% duty, so the step rate is simply the PWM
//! frequency. ENABLE is active-low.
//!
//! The pins are the source of truth: [`RaAxis::tracking`] and
//! [`RaAxis::direction`] read the output latches back rather than
//! consulting a cached flag.
//!
//! ## Sidereal rate
//!
//! ```text
//!  steps_per_revolution  = 400
//!  microstep             = 16
//!  worm_ratio            = 144  (144:1)
//!  gear_ratio            = 3    (48:16)
//!                          =========
//!                          2_764_800 microsteps per RA revolution
//!
//!  sidereal Hz = 2_764_800 / 86_164.1 s ≈ 32.088 Hz
//!  PWM period  = round(1e9 / Hz) ns
//! ```

use tracing::{debug, info};

use super::microstep::Microstep;
use super::{period_ns, MotorConfig, RaAxis};
use crate::error::{MountError, Result};
use crate::hal::{OutputPin, StatefulOutputPin, StepPwm};
use crate::msg::protocol::{Direction, Tracking};

/// Duty cycle of the step square wave
const STEP_DUTY_PERCENT: u8 = 50;

/// Digital outputs of the stepper driver
pub struct MotorPins<DIR, EN, MS1, MS2> {
    /// High = North, low = South
    pub direction: DIR,
    /// Active-low driver enable
    pub enable: EN,
    /// First microstep select line
    pub ms1: MS1,
    /// Second microstep select line
    pub ms2: MS2,
}

/// RA stepper motor controller
pub struct Motor<DIR, EN, MS1, MS2, PWM> {
    config: MotorConfig,
    pins: MotorPins<DIR, EN, MS1, MS2>,
    pwm: PWM,
    microstep: Microstep,
    running_hz: f64,
    period_ns: u64,
}

impl<DIR, EN, MS1, MS2, PWM> std::fmt::Debug for Motor<DIR, EN, MS1, MS2, PWM> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Motor")
            .field("config", &self.config)
            .field("microstep", &self.microstep)
            .field("running_hz", &self.running_hz)
            .field("period_ns", &self.period_ns)
            .finish_non_exhaustive()
    }
}

impl<DIR, EN, MS1, MS2, PWM> Motor<DIR, EN, MS1, MS2, PWM>
where
    DIR: StatefulOutputPin,
    EN: StatefulOutputPin,
    MS1: OutputPin,
    MS2: OutputPin,
    PWM: StepPwm,
{
    /// Create a controller for a validated drive train
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on a zero step count, zero max rate, ratio
    /// below 1 or unsupported microstep.
    pub fn new(config: MotorConfig, pins: MotorPins<DIR, EN, MS1, MS2>, pwm: PWM) -> Result<Self> {
        config.validate()?;
        let microstep = Microstep::try_from(config.microstep)?;

        Ok(Self {
            config,
            pins,
            pwm,
            microstep,
            running_hz: 0.0,
            period_ns: 0,
        })
    }

    /// Drive train this controller was built for
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Current microstep setting
    pub fn microstep(&self) -> Microstep {
        self.microstep
    }

    /// Last commanded step rate (0 until first commanded)
    pub fn running_hz(&self) -> f64 {
        self.running_hz
    }

    /// Last programmed PWM period
    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    /// Sidereal step rate at the current microstep setting
    pub fn sidereal_hz(&self) -> f64 {
        self.config.sidereal_hz(self.microstep)
    }

    /// Select a microstep setting; values other than 2, 4, 8, 16 select 16
    pub fn set_microstep(&mut self, value: u16) -> Result<Microstep> {
        let microstep = Microstep::from_value_or_default(value);
        let (ms1, ms2) = microstep.pin_levels();

        set_level(&mut self.pins.ms1, ms1, "microstep select 1")?;
        set_level(&mut self.pins.ms2, ms2, "microstep select 2")?;

        self.microstep = microstep;
        debug!(
            requested = value,
            microstep = microstep.value(),
            ms1,
            ms2,
            "Microstep setting applied"
        );
        Ok(microstep)
    }

    /// Run the step generator at `hz`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for any rate outside `(0, max_hz]`; the
    /// previous rate stays in effect.
    pub fn run_at_hz(&mut self, hz: f64) -> Result<()> {
        if !(hz > 0.0 && hz <= self.config.max_hz as f64) {
            return Err(MountError::InvalidConfig(format!(
                "step rate {:.3} Hz outside (0, {}]",
                hz, self.config.max_hz
            )));
        }

        let period = period_ns(hz);
        self.pwm
            .set_period_ns(period)
            .map_err(|e| MountError::hardware("step PWM period", e))?;
        // A new period can rescale the counter top, so re-apply the duty
        self.pwm
            .set_duty_cycle_percent(STEP_DUTY_PERCENT)
            .map_err(|e| MountError::hardware("step PWM duty", e))?;

        self.running_hz = hz;
        self.period_ns = period;
        info!("RA step rate set to {:.3} Hz (period {} ns)", hz, period);
        Ok(())
    }
}

impl<DIR, EN, MS1, MS2, PWM> RaAxis for Motor<DIR, EN, MS1, MS2, PWM>
where
    DIR: StatefulOutputPin + Send,
    EN: StatefulOutputPin + Send,
    MS1: OutputPin + Send,
    MS2: OutputPin + Send,
    PWM: StepPwm + Send,
{
    fn configure(&mut self) -> Result<()> {
        self.pwm
            .set_duty_cycle_percent(STEP_DUTY_PERCENT)
            .map_err(|e| MountError::hardware("step PWM duty", e))?;

        self.set_microstep(self.config.microstep)?;
        self.set_direction(Direction::North)?;
        self.set_tracking(Tracking::Off)?;
        Ok(())
    }

    fn run_at_sidereal_rate(&mut self) -> Result<f64> {
        let hz = self.sidereal_hz();
        self.run_at_hz(hz)?;
        Ok(hz)
    }

    fn set_tracking(&mut self, tracking: Tracking) -> Result<()> {
        // Enabled when the pin is low
        set_level(&mut self.pins.enable, tracking == Tracking::Off, "motor enable")?;
        info!("RA tracking {}", tracking);
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        set_level(&mut self.pins.direction, direction == Direction::North, "motor direction")?;
        info!("RA direction {}", direction);
        Ok(())
    }

    fn tracking(&mut self) -> Result<Tracking> {
        let disabled = self
            .pins
            .enable
            .is_set_high()
            .map_err(|e| MountError::hardware("motor enable", e))?;

        Ok(if disabled { Tracking::Off } else { Tracking::On })
    }

    fn direction(&mut self) -> Result<Direction> {
        let north = self
            .pins
            .direction
            .is_set_high()
            .map_err(|e| MountError::hardware("motor direction", e))?;

        Ok(if north { Direction::North } else { Direction::South })
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool, name: &str) -> Result<()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|e| MountError::hardware(name, e))
}
