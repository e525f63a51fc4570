//! # Message Protocol Types
//!
//! Frame sentinels and the tagged message variant carried between nodes.
//!
//! ```text
//! ^<KIND>|<f1>|<f2>|...|<fn>~
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MountError, Result};

/// Opens a frame
pub const FRAME_START: u8 = b'^';

/// Closes a frame
pub const FRAME_END: u8 = b'~';

/// Separates fields inside a frame
pub const FIELD_SEPARATOR: u8 = b'|';

/// Joins sub-arguments inside one field
pub const ARG_SEPARATOR: u8 = b',';

/// Written after every frame for readability on the wire
pub const FRAME_TRAILER: u8 = b'\n';

/// Whether the RA motor is energised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tracking {
    On,
    Off,
}

impl Tracking {
    pub fn as_str(self) -> &'static str {
        match self {
            Tracking::On => "On",
            Tracking::Off => "Off",
        }
    }
}

impl fmt::Display for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tracking {
    type Err = MountError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "On" => Ok(Tracking::On),
            "Off" => Ok(Tracking::Off),
            other => Err(MountError::Protocol(format!("Unknown tracking value: {:?}", other))),
        }
    }
}

/// Direction of RA rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = MountError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "North" => Ok(Direction::North),
            "South" => Ok(Direction::South),
            other => Err(MountError::Protocol(format!("Unknown direction value: {:?}", other))),
        }
    }
}

/// RA telemetry: the only state the motor node broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RaState {
    pub tracking: Tracking,
    pub direction: Direction,
    pub position: u32,
}

impl Default for RaState {
    fn default() -> Self {
        Self {
            tracking: Tracking::Off,
            direction: Direction::North,
            position: 0,
        }
    }
}

/// Commands understood by the RA node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RaCommand {
    SetTracking,
    SetDirection,
}

impl RaCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            RaCommand::SetTracking => "SetTracking",
            RaCommand::SetDirection => "SetDirection",
        }
    }
}

impl fmt::Display for RaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RaCommand {
    type Err = MountError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SetTracking" => Ok(RaCommand::SetTracking),
            "SetDirection" => Ok(RaCommand::SetDirection),
            other => Err(MountError::Protocol(format!("Unknown RA command: {:?}", other))),
        }
    }
}

/// Wire tag of each message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    Foo,
    Handset,
    #[serde(rename = "RADriver")]
    RaDriver,
    #[serde(rename = "RADriverCmd")]
    RaDriverCmd,
}

impl MessageKind {
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Foo,
        MessageKind::Handset,
        MessageKind::RaDriver,
        MessageKind::RaDriverCmd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Foo => "Foo",
            MessageKind::Handset => "Handset",
            MessageKind::RaDriver => "RADriver",
            MessageKind::RaDriverCmd => "RADriverCmd",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MountError;

    fn from_str(s: &str) -> Result<Self> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MountError::Protocol(format!("Unknown message kind: {:?}", s)))
    }
}

/// A message on the fabric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Message {
    /// Reserved for diagnostics
    Foo { name: String },

    /// Keystrokes from the handset
    Handset { keys: Vec<String> },

    /// RA telemetry
    #[serde(rename = "RADriver")]
    RaDriver(RaState),

    /// Command addressed to the RA node
    #[serde(rename = "RADriverCmd")]
    RaDriverCmd { cmd: RaCommand, args: Vec<String> },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Foo { .. } => MessageKind::Foo,
            Message::Handset { .. } => MessageKind::Handset,
            Message::RaDriver(_) => MessageKind::RaDriver,
            Message::RaDriverCmd { .. } => MessageKind::RaDriverCmd,
        }
    }

    /// `RADriverCmd` with a single argument
    pub fn ra_command(cmd: RaCommand, arg: impl Into<String>) -> Self {
        Message::RaDriverCmd {
            cmd,
            args: vec![arg.into()],
        }
    }
}
