//! Simulated mount hardware.
//!
//! Lets every node binary run on a host without the boards. The model is
//! deliberately small: the encoder sits on the motor shaft, so while the
//! driver is enabled and the step PWM is running the encoder count moves
//! at `step_hz * 16384 / (steps_per_revolution * microstep)` counts per
//! second, forward when the direction pin is high.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::{DelayNs, OutputPin, SetDutyCycle, SpiBus, StatefulOutputPin, StepPwm};
use crate::display::{Display, Rgb};
use crate::encoder::amt22::{AMT22_RESET, AMT22_ZERO};
use crate::encoder::multiturn::COUNTS_PER_TURN;
use crate::encoder::parity::with_parity;
use crate::error::Result;
use crate::motor::{Microstep, MotorPins};

/// Output pin backed by a shared flag; clones observe the same level
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
        }
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    /// Drive the level from outside the owning driver
    pub fn force(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> std::result::Result<(), Infallible> {
        self.force(false);
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Infallible> {
        self.force(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> std::result::Result<bool, Infallible> {
        Ok(self.is_high())
    }

    fn is_set_low(&mut self) -> std::result::Result<bool, Infallible> {
        Ok(!self.is_high())
    }
}

/// Blocking delay on the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

#[derive(Debug)]
struct MountModel {
    counts: f64,
    step_hz: f64,
    duty: u16,
    last_update: Instant,
    /// Which byte of the two-byte SPI exchange comes next
    low_byte_next: bool,
    pending_low: u8,
}

#[derive(Debug)]
struct Shared {
    model: Mutex<MountModel>,
    direction: SimPin,
    enable: SimPin,
    ms1: SimPin,
    ms2: SimPin,
    steps_per_revolution: u32,
}

/// A stepper, its driver and a shaft encoder sharing one physical model
#[derive(Debug, Clone)]
pub struct SimulatedMount {
    shared: Arc<Shared>,
}

impl SimulatedMount {
    /// Power-on state: driver disabled, PWM stopped, encoder at zero
    pub fn new(steps_per_revolution: u32) -> Self {
        let shared = Shared {
            model: Mutex::new(MountModel {
                counts: 0.0,
                step_hz: 0.0,
                duty: 0,
                last_update: Instant::now(),
                low_byte_next: false,
                pending_low: 0,
            }),
            direction: SimPin::new(true),
            enable: SimPin::new(true),
            ms1: SimPin::new(true),
            ms2: SimPin::new(true),
            steps_per_revolution: steps_per_revolution.max(1),
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Driver inputs for the motor controller
    pub fn motor_pins(&self) -> MotorPins<SimPin, SimPin, SimPin, SimPin> {
        MotorPins {
            direction: self.shared.direction.clone(),
            enable: self.shared.enable.clone(),
            ms1: self.shared.ms1.clone(),
            ms2: self.shared.ms2.clone(),
        }
    }

    /// Step generator feeding the driver's STEP input
    pub fn pwm(&self) -> SimPwm {
        SimPwm { mount: self.clone() }
    }

    /// SPI bus with the encoder on it
    pub fn spi(&self) -> SimSpi {
        SimSpi { mount: self.clone() }
    }

    /// Encoder chip-select line
    pub fn chip_select(&self) -> SimPin {
        SimPin::new(true)
    }

    /// Current single-turn encoder reading
    pub fn encoder_reading(&self) -> u16 {
        let mut model = self.lock();
        self.catch_up(&mut model);
        single_turn(model.counts)
    }

    /// Move the model forward by `dt` regardless of the wall clock
    pub fn advance(&self, dt: Duration) {
        let mut model = self.lock();
        self.integrate(&mut model, dt);
    }

    fn lock(&self) -> MutexGuard<'_, MountModel> {
        // The model holds plain numbers; a poisoned lock is still usable
        self.shared
            .model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn counts_per_second(&self, model: &MountModel) -> f64 {
        let enabled = !self.shared.enable.is_high();
        if !enabled || model.duty == 0 || model.step_hz <= 0.0 {
            return 0.0;
        }

        let microstep = Microstep::from_pin_levels(self.shared.ms1.is_high(), self.shared.ms2.is_high());
        let microsteps_per_turn = self.shared.steps_per_revolution as f64 * microstep.value() as f64;
        let rate = model.step_hz * COUNTS_PER_TURN as f64 / microsteps_per_turn;

        if self.shared.direction.is_high() {
            rate
        } else {
            -rate
        }
    }

    fn integrate(&self, model: &mut MountModel, dt: Duration) {
        model.counts += self.counts_per_second(model) * dt.as_secs_f64();
    }

    fn catch_up(&self, model: &mut MountModel) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(model.last_update);
        self.integrate(model, dt);
        model.last_update = now;
    }

    fn exchange(&self, command: u8) -> u8 {
        let mut model = self.lock();

        if !model.low_byte_next {
            self.catch_up(&mut model);
            let [high, low] = with_parity(single_turn(model.counts)).to_be_bytes();
            model.pending_low = low;
            model.low_byte_next = true;
            return high;
        }

        model.low_byte_next = false;
        match command {
            AMT22_ZERO => {
                debug!("Simulated encoder zeroed");
                model.counts = 0.0;
            }
            AMT22_RESET => debug!("Simulated encoder reset"),
            _ => {}
        }
        model.pending_low
    }
}

fn single_turn(counts: f64) -> u16 {
    (counts.floor() as i64).rem_euclid(COUNTS_PER_TURN as i64) as u16
}

/// Step PWM of a [`SimulatedMount`]
#[derive(Debug, Clone)]
pub struct SimPwm {
    mount: SimulatedMount,
}

impl SimPwm {
    /// Step rate currently generated
    pub fn step_hz(&self) -> f64 {
        self.mount.lock().step_hz
    }
}

impl embedded_hal::pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> std::result::Result<(), Infallible> {
        let mut model = self.mount.lock();
        self.mount.catch_up(&mut model);
        model.duty = duty;
        Ok(())
    }
}

impl StepPwm for SimPwm {
    fn set_period_ns(&mut self, period_ns: u64) -> std::result::Result<(), Infallible> {
        let mut model = self.mount.lock();
        self.mount.catch_up(&mut model);
        model.step_hz = if period_ns == 0 { 0.0 } else { 1e9 / period_ns as f64 };
        trace!(period_ns, step_hz = model.step_hz, "Simulated PWM period");
        Ok(())
    }
}

/// Encoder SPI bus of a [`SimulatedMount`]
#[derive(Debug, Clone)]
pub struct SimSpi {
    mount: SimulatedMount,
}

impl embedded_hal::spi::ErrorType for SimSpi {
    type Error = Infallible;
}

impl SpiBus for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> std::result::Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.mount.exchange(0x00);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> std::result::Result<(), Infallible> {
        for &word in words {
            self.mount.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> std::result::Result<(), Infallible> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let reply = self.mount.exchange(write.get(i).copied().unwrap_or(0x00));
            if let Some(slot) = read.get_mut(i) {
                *slot = reply;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> std::result::Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.mount.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), Infallible> {
        Ok(())
    }
}

/// Display that writes drawn text to the log
#[derive(Debug, Default)]
pub struct LogDisplay {
    name: String,
}

impl LogDisplay {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Display for LogDisplay {
    fn clear(&mut self, color: Rgb) -> Result<()> {
        trace!(display = %self.name, ?color, "clear");
        Ok(())
    }

    fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16, color: Rgb) -> Result<()> {
        trace!(display = %self.name, x, y, width, height, ?color, "fill_rect");
        Ok(())
    }

    fn draw_text(&mut self, x: u16, y: u16, text: &str, color: Rgb) -> Result<()> {
        trace!(display = %self.name, x, y, text, ?color, "draw_text");
        Ok(())
    }
}
