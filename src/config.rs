//! # Configuration Module
//!
//! Handles loading and validating node configuration from TOML files.
//!
//! Each node binary compiles its own file in (`config/<node>.toml`); every
//! section and field has a default, so a file only lists what differs.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{MountError, Result};
use crate::hid::FormDefaults;
use crate::hid::keypad::MIN_KEY_QUEUE;
use crate::motor::MotorConfig;
use crate::serial::{DEFAULT_BAUD_RATE, STANDARD_BAUD_RATES};

/// Filter value that shows every message on the console
pub const CONSOLE_SHOW_ALL: &str = "*ANY";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub fabric: FabricConfig,
    #[serde(default)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub keypad: KeypadConfig,
    #[serde(default)]
    pub handset: FormDefaults,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// UART links to the neighbouring nodes
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    /// Device towards the handset end of the chain; none ends the chain
    #[serde(default)]
    pub upstream: Option<String>,

    /// Device towards the console end of the chain
    #[serde(default)]
    pub downstream: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Mid-frame silence before a partial frame is dropped
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,
}

/// Consumer queue sizing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FabricConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Absolute encoder timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EncoderConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Wait after a zero command before the encoder answers again
    #[serde(default = "default_zero_settle_ms")]
    pub zero_settle_ms: u32,
}

/// RA state broadcast
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_interval_ms")]
    pub interval_ms: u64,
}

/// Keypad debounce timing
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct KeypadConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_key_queue_capacity")]
    pub queue_capacity: usize,
}

/// Console view
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// `*ANY` or text a message body must contain to be shown
    #[serde(default = "default_console_filter")]
    pub filter: String,

    #[serde(default = "default_console_rows")]
    pub rows: usize,

    #[serde(default = "default_console_cols")]
    pub cols: usize,

    /// JSONL mirror of every received message
    #[serde(default)]
    pub traffic_log: Option<String>,
}

/// Handset character grid
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_display_rows")]
    pub rows: usize,

    #[serde(default = "default_display_cols")]
    pub cols: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_frame_timeout_ms() -> u64 { 1000 }

fn default_queue_capacity() -> usize { 16 }

fn default_poll_interval_ms() -> u64 { 700 }
fn default_zero_settle_ms() -> u32 { 240 }

fn default_telemetry_interval_ms() -> u64 { 2000 }

fn default_settle_ms() -> u64 { 150 }
fn default_cooldown_ms() -> u64 { 500 }
fn default_key_queue_capacity() -> usize { MIN_KEY_QUEUE }

fn default_console_filter() -> String { CONSOLE_SHOW_ALL.to_string() }
fn default_console_rows() -> usize { 10 }
fn default_console_cols() -> usize { 20 }

fn default_display_rows() -> usize { 8 }
fn default_display_cols() -> usize { 11 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            downstream: None,
            baud_rate: default_baud_rate(),
            frame_timeout_ms: default_frame_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self { queue_capacity: default_queue_capacity() }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            zero_settle_ms: default_zero_settle_ms(),
        }
    }
}

impl EncoderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_ms: default_telemetry_interval_ms() }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            cooldown_ms: default_cooldown_ms(),
            queue_capacity: default_key_queue_capacity(),
        }
    }
}

impl KeypadConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            filter: default_console_filter(),
            rows: default_console_rows(),
            cols: default_console_cols(),
            traffic_log: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rows: default_display_rows(),
            cols: default_display_cols(),
        }
    }
}

/// Compiled-in configuration for each node binary
const HANDSET_TOML: &str = include_str!("../config/handset.toml");
const RA_DRIVER_TOML: &str = include_str!("../config/ra-driver.toml");
const CONSOLE_TOML: &str = include_str!("../config/console.toml");

/// The three node roles on the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Handset,
    RaDriver,
    Console,
}

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeRole::Handset => "handset",
            NodeRole::RaDriver => "ra-driver",
            NodeRole::Console => "console",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Configuration compiled into the binary for `role`
    ///
    /// # Errors
    ///
    /// Returns error if the embedded file fails to parse or validate.
    pub fn embedded(role: NodeRole) -> Result<Self> {
        let contents = match role {
            NodeRole::Handset => HANDSET_TOML,
            NodeRole::RaDriver => RA_DRIVER_TOML,
            NodeRole::Console => CONSOLE_TOML,
        };
        Self::parse(contents)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use eqmount::config::Config;
    ///
    /// let config = Config::load("config/ra-driver.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first value out of range.
    pub fn validate(&self) -> Result<()> {
        if !STANDARD_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(MountError::InvalidConfig(format!(
                "baud_rate must be one of: {:?}",
                STANDARD_BAUD_RATES
            )));
        }

        for (name, path) in [("upstream", &self.serial.upstream), ("downstream", &self.serial.downstream)] {
            if matches!(path, Some(p) if p.is_empty()) {
                return Err(MountError::InvalidConfig(format!(
                    "serial {} path cannot be empty, omit it to end the chain",
                    name
                )));
            }
        }

        if self.serial.frame_timeout_ms == 0 || self.serial.frame_timeout_ms > 60000 {
            return Err(MountError::InvalidConfig(
                "frame_timeout_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.fabric.queue_capacity == 0 {
            return Err(MountError::InvalidConfig(
                "fabric queue_capacity must be greater than 0".to_string(),
            ));
        }

        self.motor.validate()?;

        if self.encoder.poll_interval_ms == 0 {
            return Err(MountError::InvalidConfig(
                "encoder poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.telemetry.interval_ms == 0 {
            return Err(MountError::InvalidConfig(
                "telemetry interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.keypad.settle_ms == 0 {
            return Err(MountError::InvalidConfig(
                "keypad settle_ms must be greater than 0".to_string(),
            ));
        }

        if self.keypad.queue_capacity < MIN_KEY_QUEUE {
            return Err(MountError::InvalidConfig(format!(
                "keypad queue_capacity must be at least {}",
                MIN_KEY_QUEUE
            )));
        }

        if self.console.filter.is_empty() {
            return Err(MountError::InvalidConfig(format!(
                "console filter cannot be empty, use {} to show everything",
                CONSOLE_SHOW_ALL
            )));
        }

        for (name, rows, cols) in [
            ("console", self.console.rows, self.console.cols),
            ("display", self.display.rows, self.display.cols),
        ] {
            // Status line plus rule need two rows
            if rows < 3 || cols == 0 {
                return Err(MountError::InvalidConfig(format!(
                    "{} grid must have at least 3 rows and 1 column",
                    name
                )));
            }
        }

        Ok(())
    }
}
