//! # RA Driver Node
//!
//! Middle of the chain. Owns the RA stepper and its absolute encoder.
//!
//! Boot sequence:
//! 1. Zero the encoder
//! 2. Configure the motor (microstep, North, tracking off)
//! 3. Command the sidereal rate
//!
//! After boot it polls the encoder, broadcasts `RADriver` telemetry and
//! applies `RADriverCmd` frames to the motor.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{Fabric, Links, NodeHandle};
use crate::config::Config;
use crate::encoder::{AbsoluteEncoder, Amt22};
use crate::error::{MountError, Result};
use crate::hal::sim::{SimPin, SimPwm, SimSpi, SimulatedMount, ThreadDelay};
use crate::motor::monitor::monitor_position;
use crate::motor::{Motor, RaAxis, RaTelemetry};
use crate::msg::protocol::{Direction, Message, MessageKind, RaCommand, Tracking};
use crate::msg::LossyReceiver;
use crate::telemetry::broadcast_ra_state;

/// Motor driven by the simulated mount
pub type SimAxis = Motor<SimPin, SimPin, SimPin, SimPin, SimPwm>;

/// Encoder read through the simulated mount
pub type SimEncoder = Amt22<SimSpi, SimPin, ThreadDelay>;

/// Motor and encoder sharing one simulated mount
pub fn simulated_hardware(config: &Config) -> Result<(SimAxis, SimEncoder)> {
    let mount = SimulatedMount::new(config.motor.steps_per_revolution);
    let axis = Motor::new(config.motor, mount.motor_pins(), mount.pwm())?;
    let encoder = Amt22::new(mount.spi(), mount.chip_select(), ThreadDelay)?
        .with_settle_ms(config.encoder.zero_settle_ms);
    Ok((axis, encoder))
}

/// Zero, configure and start the axis; returns the commanded step rate
pub fn boot<A, E>(axis: &mut A, encoder: &mut E) -> Result<f64>
where
    A: RaAxis + ?Sized,
    E: AbsoluteEncoder + ?Sized,
{
    encoder.zero()?;
    axis.configure()?;
    let hz = axis.run_at_sidereal_rate()?;
    info!("RA axis running at sidereal rate, {:.4} Hz", hz);
    Ok(hz)
}

/// Apply one `RADriverCmd` to the axis
///
/// # Errors
///
/// Returns `Protocol` for a missing or unknown argument; the axis is left
/// untouched.
pub fn apply_command<A: RaAxis + ?Sized>(axis: &mut A, cmd: RaCommand, args: &[String]) -> Result<()> {
    let arg = args
        .first()
        .ok_or_else(|| MountError::Protocol(format!("{} needs an argument", cmd)))?;

    match cmd {
        RaCommand::SetTracking => axis.set_tracking(arg.parse::<Tracking>()?),
        RaCommand::SetDirection => axis.set_direction(arg.parse::<Direction>()?),
    }
}

async fn run_commands<A: RaAxis>(axis: Arc<Mutex<A>>, mut commands: LossyReceiver<Message>) {
    while let Some(message) = commands.recv().await {
        let Message::RaDriverCmd { cmd, args } = message else {
            continue;
        };

        let mut axis = axis.lock().await;
        if let Err(e) = apply_command(&mut *axis, cmd, &args) {
            warn!("Ignoring {} {:?}: {}", cmd, args, e);
        }
    }
}

async fn log_foo(mut messages: LossyReceiver<Message>) {
    while let Some(message) = messages.recv().await {
        if let Message::Foo { name } = message {
            info!("Foo received: {:?}", name);
        }
    }
}

/// Boot the axis and start the RA driver node
///
/// Boot blocks through the encoder's settle delay, so it runs on the
/// blocking pool.
///
/// # Errors
///
/// Returns the first hardware or configuration error hit during boot.
pub async fn spawn<A, E>(config: &Config, links: Links, mut axis: A, mut encoder: E) -> Result<NodeHandle>
where
    A: RaAxis + 'static,
    E: AbsoluteEncoder + 'static,
{
    let (axis, encoder) = tokio::task::spawn_blocking(move || {
        boot(&mut axis, &mut encoder).map(|_| (axis, encoder))
    })
    .await
    .map_err(|e| MountError::Hardware(format!("RA boot task failed: {}", e)))??;

    let capacity = config.fabric.queue_capacity;
    let mut fabric = Fabric::new(links, config.serial.frame_timeout());
    let foo = fabric.subscribe(MessageKind::Foo, capacity);
    let commands = fabric.subscribe(MessageKind::RaDriverCmd, capacity);

    let mut tasks = Vec::new();
    let broker = fabric.start(&mut tasks);

    let axis = Arc::new(Mutex::new(axis));
    let telemetry = Arc::new(RaTelemetry::new());

    tasks.push(tokio::spawn(monitor_position(
        Arc::new(Mutex::new(encoder)),
        Arc::clone(&telemetry),
        config.encoder.poll_interval(),
    )));
    tasks.push(tokio::spawn(broadcast_ra_state(
        Arc::clone(&axis),
        telemetry,
        Arc::clone(&broker),
        config.telemetry.interval(),
    )));
    tasks.push(tokio::spawn(run_commands(axis, commands)));
    tasks.push(tokio::spawn(log_foo(foo)));

    info!("RA driver node started");
    Ok(NodeHandle::new(broker, tasks))
}
