//! # Inter-node Message Fabric
//!
//! A framed, line-oriented protocol over two UARTs. Frames look like
//! `^KIND|field|field~` and are followed by a `\n` on the wire.
//!
//! This module handles:
//! - The message variant and its wire tags ([`protocol`])
//! - Framing and unframing ([`encoder`], [`decoder`])
//! - Bounded drop-oldest consumer queues ([`queue`])
//! - Publishing, store-and-forward relaying and per-kind dispatch ([`broker`])

pub mod broker;
pub mod decoder;
pub mod encoder;
pub mod protocol;
pub mod queue;

pub use broker::Broker;
pub use protocol::{Direction, Message, MessageKind, RaCommand, RaState, Tracking};
pub use queue::{lossy_channel, LossyReceiver, LossySender};
