//! Periodic RA telemetry broadcast.
//!
//! Tracking and direction are read back from the motor pins on every
//! tick; position comes from the encoder monitor's shared scalar. There is
//! no acknowledgement: the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::Result;
use crate::motor::{RaAxis, RaTelemetry};
use crate::msg::protocol::{Message, RaState};
use crate::msg::Broker;

/// Default broadcast cadence
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Sample the current RA state
pub fn snapshot<A: RaAxis + ?Sized>(axis: &mut A, telemetry: &RaTelemetry) -> Result<RaState> {
    Ok(RaState {
        tracking: axis.tracking()?,
        direction: axis.direction()?,
        position: telemetry.position(),
    })
}

/// Publish a `RADriver` frame every `period`, forever
pub async fn broadcast_ra_state<A>(
    axis: Arc<Mutex<A>>,
    telemetry: Arc<RaTelemetry>,
    broker: Arc<Broker>,
    period: Duration,
) where
    A: RaAxis + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let state = {
            let mut axis = axis.lock().await;
            snapshot(&mut *axis, &telemetry)
        };

        match state {
            Ok(state) => {
                debug!(?state, "Broadcasting RA state");
                if let Err(e) = broker.publish(&Message::RaDriver(state)).await {
                    warn!("Failed to publish RA state: {}", e);
                }
            }
            Err(e) => warn!("Failed to sample RA state: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimulatedMount;
    use crate::motor::{Motor, MotorConfig};
    use crate::msg::decoder::{decode_frame, DEFAULT_FRAME_TIMEOUT};
    use crate::msg::protocol::{Direction, Tracking};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::serial::SerialPortIO;

    fn sim_motor() -> impl RaAxis {
        let mount = SimulatedMount::new(400);
        let mut motor = Motor::new(MotorConfig::default(), mount.motor_pins(), mount.pwm()).unwrap();
        motor.configure().unwrap();
        motor
    }

    #[test]
    fn test_snapshot_reads_pins_and_position() {
        let mut motor = sim_motor();
        let telemetry = RaTelemetry::new();
        telemetry.set_position(99);

        motor.set_tracking(Tracking::On).unwrap();
        motor.set_direction(Direction::South).unwrap();

        let state = snapshot(&mut motor, &telemetry).unwrap();
        assert_eq!(
            state,
            RaState {
                tracking: Tracking::On,
                direction: Direction::South,
                position: 99,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcasts_every_interval() {
        let port = MockSerialPort::new();
        let broker = Arc::new(Broker::new(
            None,
            Some(Box::new(port.clone()) as Box<dyn SerialPortIO>),
            DEFAULT_FRAME_TIMEOUT,
        ));
        let telemetry = Arc::new(RaTelemetry::new());
        telemetry.set_position(4242);

        let task = tokio::spawn(broadcast_ra_state(
            Arc::new(Mutex::new(sim_motor())),
            telemetry,
            broker,
            DEFAULT_INTERVAL,
        ));

        tokio::time::sleep(Duration::from_millis(4100)).await;
        task.abort();

        // Ticks at 0, 2 s and 4 s
        let writes = port.get_written_data();
        assert_eq!(writes.len(), 3);
        let frame = &writes[0][..writes[0].len() - 1];
        assert_eq!(
            decode_frame(frame).unwrap(),
            Message::RaDriver(RaState {
                tracking: Tracking::Off,
                direction: Direction::North,
                position: 4242,
            })
        );
    }
}
