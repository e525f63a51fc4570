//! # Keypad Debounce
//!
//! Each key's falling-edge handler writes the key into a single "most
//! recently pressed" slot. The debounce task samples the slot: if a key is
//! pending it waits the settle window, and publishes the key only if the
//! slot still holds it. A slot that changed mid-window is a glitch and is
//! discarded. Every cycle ends with a cooldown, which also caps the repeat
//! rate.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::keys::Key;

/// Time a key must stay in the slot to count as pressed
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(150);

/// Pause after each debounce cycle
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// Minimum depth of the key-event queue
pub const MIN_KEY_QUEUE: usize = 100;

/// Single-word slot shared between edge handlers and the debounce task
#[derive(Debug, Default)]
pub struct KeySlot {
    key: AtomicU8,
}

impl KeySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press; safe to call from an interrupt context
    pub fn press(&self, key: Key) {
        self.key.store(key as u8, Ordering::Release);
    }

    pub fn peek(&self) -> Key {
        Key::from_u8(self.key.load(Ordering::Acquire))
    }

    /// Clear the slot if it still holds `key`
    pub fn take_if(&self, key: Key) -> bool {
        self.key
            .compare_exchange(key as u8, Key::Undefined as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn clear(&self) {
        self.key.store(Key::Undefined as u8, Ordering::Release);
    }
}

/// One sample-wait-compare cycle, without the cooldown
pub async fn debounce_once(slot: &KeySlot, settle: Duration) -> Option<Key> {
    let key = slot.peek();
    if key == Key::Undefined {
        return None;
    }

    tokio::time::sleep(settle).await;

    if slot.take_if(key) {
        Some(key)
    } else {
        debug!("Key {} bounced, discarded", key);
        slot.clear();
        None
    }
}

/// Debounce forever, publishing keys until the receiver goes away
pub async fn run_debouncer(slot: Arc<KeySlot>, keys: mpsc::Sender<Key>, settle: Duration, cooldown: Duration) {
    loop {
        if let Some(key) = debounce_once(&slot, settle).await {
            match keys.try_send(key) {
                Ok(()) => debug!("Key {} pressed", key),
                Err(mpsc::error::TrySendError::Full(key)) => {
                    warn!("Key queue full, dropping {}", key);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    info!("Key queue closed, debouncer stopping");
                    return;
                }
            }
        }

        tokio::time::sleep(cooldown).await;
    }
}

/// Host stand-in for the key GPIOs: each input line names a key
///
/// Lines may hold several whitespace-separated names. Unknown names are
/// logged and skipped.
pub async fn feed_key_lines<R>(reader: R, slot: Arc<KeySlot>, spacing: Duration)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("Keypad input failed: {}", e);
                return;
            }
        };

        for name in line.split_whitespace() {
            match Key::from_name(name) {
                Key::Undefined => warn!("Unknown key {:?}", name),
                key => {
                    slot.press(key);
                    // Hold the key long enough for the debouncer to accept it
                    tokio::time::sleep(spacing).await;
                }
            }
        }
    }
}
