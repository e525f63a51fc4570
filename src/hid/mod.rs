//! # Handset Input
//!
//! Keypad and menu logic of the handset node.
//!
//! This module handles:
//! - Key identities and their wire names ([`keys`])
//! - Software debounce of the edge-triggered keypad ([`keypad`])
//! - Field edit buffers and their parsing ([`form`])
//! - The menu/edit state machine ([`machine`])

pub mod form;
pub mod keypad;
pub mod keys;
pub mod machine;
pub mod state;

pub use form::{FormDefaults, HandsetForm};
pub use keypad::KeySlot;
pub use keys::Key;
pub use machine::{Handset, Output};
pub use state::State;
