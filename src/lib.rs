//! # EqMount Library
//!
//! Firmware core for a small equatorial telescope mount built from three
//! nodes on a serial chain: `Handset <-> RADriver <-> Console`.
//!
//! This library provides the RA stepper and encoder control, the framed
//! message fabric between nodes, the handset menu and keypad handling, and
//! the character-grid display shared by the handset and console.

pub mod config;
pub mod display;
pub mod encoder;
pub mod error;
pub mod hal;
pub mod hid;
pub mod logging;
pub mod motor;
pub mod msg;
pub mod node;
pub mod serial;
pub mod telemetry;
