//! # Hardware Abstraction
//!
//! The mount talks to its hardware only through `embedded-hal` 1.0 traits,
//! so the same control code runs against real peripherals, the simulated
//! mount in [`sim`], or recording mocks in tests.
//!
//! The one thing `embedded-hal` does not cover is reprogramming a PWM
//! generator's period, which is how the RA step rate is set. [`StepPwm`]
//! adds that on top of [`SetDutyCycle`].

pub mod sim;

pub use embedded_hal::delay::DelayNs;
pub use embedded_hal::digital::{OutputPin, StatefulOutputPin};
pub use embedded_hal::pwm::SetDutyCycle;
pub use embedded_hal::spi::SpiBus;

/// Hardware PWM generator driving the stepper's STEP input.
///
/// The frequency of the square wave is the step rate; duty cycle is held
/// at 50% by the motor controller.
pub trait StepPwm: SetDutyCycle {
    /// Program the PWM period in nanoseconds.
    fn set_period_ns(&mut self, period_ns: u64) -> Result<(), Self::Error>;
}
