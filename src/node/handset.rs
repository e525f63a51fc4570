//! # Handset Node
//!
//! Head of the chain. Keys come in through the debounced keypad, drive the
//! menu state machine and go out as `Handset` frames (plus any RA
//! commands). Incoming `RADriver` frames refresh the status line.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Fabric, Links, NodeHandle};
use crate::config::Config;
use crate::display::{status_line, Display, Renderer, Screen};
use crate::error::Result;
use crate::hid::keypad::{feed_key_lines, run_debouncer};
use crate::hid::{Handset, Key, KeySlot};
use crate::msg::protocol::{Message, MessageKind, RaState};

/// Extra hold time on top of one debounce cycle for host key input
const KEY_HOLD_MARGIN: Duration = Duration::from_millis(50);

/// Menu state machine bound to its screen
#[derive(Debug)]
pub struct HandsetUi<D> {
    machine: Handset,
    screen: Screen<D>,
}

impl<D: Display> HandsetUi<D> {
    pub fn new(machine: Handset, screen: Screen<D>) -> Self {
        let mut ui = Self { machine, screen };
        ui.screen.set_status(status_line(&RaState::default()));
        ui.screen.set_body(ui.machine.display_text());
        ui
    }

    pub fn machine(&self) -> &Handset {
        &self.machine
    }

    pub fn screen(&self) -> &Screen<D> {
        &self.screen
    }

    /// Apply a key; returns the frames to publish, key echo first
    pub fn on_key(&mut self, key: Key) -> Vec<Message> {
        let output = self.machine.handle_key(key);
        self.screen.set_body(output.display);
        self.redraw();

        let mut messages = Vec::with_capacity(1 + output.commands.len());
        messages.push(Message::Handset {
            keys: vec![key.name().to_string()],
        });
        messages.extend(output.commands);
        messages
    }

    pub fn on_ra_state(&mut self, ra: RaState) {
        self.machine.set_ra_state(ra);
        self.screen.set_status(status_line(&ra));
        // RA screens show the telemetry in their body too
        self.screen.set_body(self.machine.display_text());
        self.redraw();
    }

    pub fn redraw(&mut self) {
        match self.screen.refresh() {
            Ok(0) => {}
            Ok(cells) => info!("Handset screen ({} cells):\n{}", cells, self.screen.text()),
            Err(e) => warn!("Handset redraw failed: {}", e),
        }
    }
}

fn lock<D>(ui: &Mutex<HandsetUi<D>>) -> MutexGuard<'_, HandsetUi<D>> {
    ui.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Start the handset node
///
/// `key_input` stands in for the key GPIOs: one key name per line.
pub fn spawn<R, D>(config: &Config, links: Links, key_input: R, display: D) -> Result<NodeHandle>
where
    R: AsyncBufRead + Send + Unpin + 'static,
    D: Display + 'static,
{
    let mut fabric = Fabric::new(links, config.serial.frame_timeout());
    let mut ra_states = fabric.subscribe(MessageKind::RaDriver, config.fabric.queue_capacity);

    let mut tasks = Vec::new();
    let broker = fabric.start(&mut tasks);

    let slot = Arc::new(KeySlot::new());
    let (key_tx, mut keys) = mpsc::channel(config.keypad.queue_capacity);
    let (settle, cooldown) = (config.keypad.settle(), config.keypad.cooldown());
    tasks.push(tokio::spawn(run_debouncer(Arc::clone(&slot), key_tx, settle, cooldown)));
    tasks.push(tokio::spawn(feed_key_lines(key_input, slot, settle + cooldown + KEY_HOLD_MARGIN)));

    let renderer = Renderer::new(display, config.display.rows, config.display.cols);
    let ui = Arc::new(Mutex::new(HandsetUi::new(Handset::new(&config.handset), Screen::new(renderer))));
    lock(&ui).redraw();

    let publisher = Arc::clone(&broker);
    let key_ui = Arc::clone(&ui);
    tasks.push(tokio::spawn(async move {
        while let Some(key) = keys.recv().await {
            let messages = lock(&key_ui).on_key(key);
            for message in messages {
                if let Err(e) = publisher.publish(&message).await {
                    warn!("Failed to publish {}: {}", message.kind(), e);
                }
            }
        }
        info!("Keypad closed");
    }));

    tasks.push(tokio::spawn(async move {
        while let Some(message) = ra_states.recv().await {
            match message {
                Message::RaDriver(ra) => lock(&ui).on_ra_state(ra),
                other => debug!("Ignoring {}", other.kind()),
            }
        }
    }));

    info!("Handset node started");
    Ok(NodeHandle::new(broker, tasks))
}
