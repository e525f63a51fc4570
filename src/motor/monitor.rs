//! Background encoder polling.
//!
//! The monitor is the only writer of the RA position. The telemetry
//! publisher reads it without locking; fields are independent scalars and
//! a momentarily inconsistent snapshot across them is acceptable.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::encoder::AbsoluteEncoder;
use crate::error::MountError;

/// Default encoder poll cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(700);

/// Scalars shared between the encoder monitor and the telemetry publisher
#[derive(Debug, Default)]
pub struct RaTelemetry {
    position: AtomicU32,
    parity_errors: AtomicU32,
}

impl RaTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last good extended encoder position
    pub fn position(&self) -> u32 {
        self.position.load(Ordering::Relaxed)
    }

    pub fn set_position(&self, position: u32) {
        self.position.store(position, Ordering::Relaxed);
    }

    /// Reads rejected for bad parity since boot
    pub fn parity_errors(&self) -> u32 {
        self.parity_errors.load(Ordering::Relaxed)
    }

    fn record_parity_error(&self) {
        self.parity_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Run one poll: update the shared position or log why it was kept
pub fn poll_once<E: AbsoluteEncoder + ?Sized>(encoder: &mut E, telemetry: &RaTelemetry) {
    match encoder.read_position() {
        Ok(position) => {
            debug!(position, "Encoder read");
            telemetry.set_position(position);
        }
        Err(MountError::Parity { response }) => {
            telemetry.record_parity_error();
            warn!(
                "Encoder parity error (response 0x{:04X}), keeping position {}",
                response,
                telemetry.position()
            );
        }
        Err(e) => {
            warn!("Encoder read failed: {}", e);
        }
    }
}

/// Poll the encoder forever at `period`
pub async fn monitor_position<E>(encoder: Arc<Mutex<E>>, telemetry: Arc<RaTelemetry>, period: Duration)
where
    E: AbsoluteEncoder + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let mut encoder = encoder.lock().await;
        poll_once(&mut *encoder, &telemetry);
    }
}
