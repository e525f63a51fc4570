//! # Message Broker
//!
//! Owns a node's two links. Publishes local messages on both, relays
//! every frame read on one link to the other, and hands decoded messages
//! to the queue registered for their kind.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::decoder::{decode_frame, FrameReader};
use super::encoder::encode_frame;
use super::protocol::{Message, MessageKind, FRAME_TRAILER};
use super::queue::{lossy_channel, LossyReceiver, LossySender};
use crate::error::Result;
use crate::serial::{LinkSide, SerialPortIO};

type Link = Mutex<Box<dyn SerialPortIO>>;

/// Kind-indexed consumer queues, at most one per kind
#[derive(Debug, Default)]
pub struct Subscriptions {
    queues: HashMap<MessageKind, LossySender<Message>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the queue for `kind`, replacing any earlier one
    pub fn subscribe(&mut self, kind: MessageKind, capacity: usize) -> LossyReceiver<Message> {
        if self.is_subscribed(kind) {
            warn!("Replacing existing {} subscription", kind);
        }
        let (tx, rx) = lossy_channel(capacity);
        self.queues.insert(kind, tx);
        rx
    }

    pub fn is_subscribed(&self, kind: MessageKind) -> bool {
        self.queues.contains_key(&kind)
    }

    /// Enqueue to the registered queue; `false` if nobody listens
    pub fn dispatch(&self, message: Message) -> bool {
        let kind = message.kind();
        match self.queues.get(&kind) {
            Some(queue) => {
                let evicted = queue.send(message);
                if evicted > 0 {
                    debug!(
                        "{} queue full ({}), dropped {} oldest",
                        kind,
                        queue.capacity(),
                        evicted
                    );
                }
                true
            }
            None => {
                debug!("No {} subscriber, message dropped", kind);
                false
            }
        }
    }
}

/// Publisher, relay and dispatcher for one node
pub struct Broker {
    upstream: Option<Link>,
    downstream: Option<Link>,
    subscriptions: Subscriptions,
    frame_timeout: Duration,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("upstream", &self.upstream.is_some())
            .field("downstream", &self.downstream.is_some())
            .field("subscriptions", &self.subscriptions)
            .field("frame_timeout", &self.frame_timeout)
            .finish()
    }
}

impl Broker {
    /// A broker over the given writers; a missing side ends the chain there
    pub fn new(
        upstream: Option<Box<dyn SerialPortIO>>,
        downstream: Option<Box<dyn SerialPortIO>>,
        frame_timeout: Duration,
    ) -> Self {
        Self {
            upstream: upstream.map(Mutex::new),
            downstream: downstream.map(Mutex::new),
            subscriptions: Subscriptions::new(),
            frame_timeout,
        }
    }

    /// Register a consumer queue; call before the readers start
    pub fn subscribe(&mut self, kind: MessageKind, capacity: usize) -> LossyReceiver<Message> {
        self.subscriptions.subscribe(kind, capacity)
    }

    pub fn has_link(&self, side: LinkSide) -> bool {
        self.link(side).is_some()
    }

    fn link(&self, side: LinkSide) -> Option<&Link> {
        match side {
            LinkSide::Upstream => self.upstream.as_ref(),
            LinkSide::Downstream => self.downstream.as_ref(),
        }
    }

    /// Write `frame` plus the trailer to one link, if present
    ///
    /// A failing link is logged and skipped; there is no retry.
    async fn write_link(&self, side: LinkSide, frame: &[u8]) {
        let Some(link) = self.link(side) else {
            return;
        };

        let mut bytes = Vec::with_capacity(frame.len() + 1);
        bytes.extend_from_slice(frame);
        bytes.push(FRAME_TRAILER);

        let mut port = link.lock().await;
        let result = match port.write_all(&bytes).await {
            Ok(()) => port.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Failed to write {} link: {}", side, e);
        }
    }

    /// Encode `message` and emit it on every present link
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the message cannot be framed.
    pub async fn publish(&self, message: &Message) -> Result<()> {
        let frame = encode_frame(message)?;
        debug!("Publishing {}", String::from_utf8_lossy(&frame));

        self.write_link(LinkSide::Upstream, &frame).await;
        self.write_link(LinkSide::Downstream, &frame).await;
        Ok(())
    }

    /// Relay a raw frame received on `from` to the other link
    pub async fn relay(&self, from: LinkSide, frame: &[u8]) {
        self.write_link(from.opposite(), frame).await;
    }

    /// Decode a raw frame and hand it to its queue; bad frames are dropped
    pub fn dispatch(&self, frame: &[u8]) -> bool {
        match decode_frame(frame) {
            Ok(message) => self.subscriptions.dispatch(message),
            Err(e) => {
                warn!("Dropping frame {}: {}", String::from_utf8_lossy(frame), e);
                false
            }
        }
    }

    /// Read frames from one link until it closes: relay, then dispatch
    pub async fn run_reader<R>(&self, side: LinkSide, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut frames = FrameReader::new(reader, self.frame_timeout);
        info!("Reading frames from {} link", side);

        loop {
            match frames.next_frame().await {
                Ok(Some(frame)) => {
                    self.relay(side, &frame).await;
                    self.dispatch(&frame);
                }
                Ok(None) => {
                    warn!("{} link closed", side);
                    return;
                }
                Err(e) => {
                    warn!("{} link read failed: {}", side, e);
                    return;
                }
            }
        }
    }
}
