//! Configuration file.
//!
//! Both binaries read the same optional `m4k.toml`. Every key has a stock
//! default, so a config file only needs the values it changes; command-line
//! flags override the file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [device]
//! width = 1236              # Page width in pixels
//! height = 1648             # Page height in pixels
//! encoding = "jpeg"         # "jpeg" or "png"
//! quality = 75              # JPEG quality (1-100)
//! rotate = false            # Rotate landscape pages instead of double-wide
//!
//! [transfer]
//! port = 49494              # Receiver port, used when an address has none
//! connect_timeout_secs = 10
//! io_timeout_secs = 600     # Whole upload, connect to close
//!
//! [receiver]
//! accept_timeout_secs = 300 # Give up when nobody connects
//! connection_timeout_secs = 900
//! destination = "/mnt/us/documents/Manga"
//!
//! [processing]
//! max_processes = 4         # Transform workers (omit for auto = cores - 1)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Encoding;
use crate::protocol::{ReceiverTimeouts, SenderTimeouts};
use crate::transform::default_workers;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "m4k.toml";

/// Configuration loaded from `m4k.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Target reading device.
    pub device: DeviceConfig,
    /// Sender side of the transfer.
    pub transfer: TransferConfig,
    /// Receiver running on the device.
    pub receiver: ReceiverConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.width == 0 || self.device.height == 0 {
            return Err(ConfigError::Validation(
                "device.width and device.height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.device.quality) {
            return Err(ConfigError::Validation(
                "device.quality must be 1-100".into(),
            ));
        }
        if self.transfer.port == 0 {
            return Err(ConfigError::Validation(
                "transfer.port must be non-zero".into(),
            ));
        }
        if self.transfer.connect_timeout_secs == 0
            || self.transfer.io_timeout_secs == 0
            || self.receiver.accept_timeout_secs == 0
            || self.receiver.connection_timeout_secs == 0
        {
            return Err(ConfigError::Validation("timeouts must be non-zero".into()));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// The reading device pages are converted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub width: u32,
    pub height: u32,
    pub encoding: Encoding,
    pub quality: u8,
    /// Rotate landscape pages instead of rendering them double-wide.
    pub rotate: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        // Kindle Paperwhite (5th gen) panel.
        Self {
            width: 1236,
            height: 1648,
            encoding: Encoding::Jpeg,
            quality: 75,
            rotate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            port: 49494,
            connect_timeout_secs: 10,
            io_timeout_secs: 600,
        }
    }
}

impl TransferConfig {
    pub fn timeouts(&self) -> SenderTimeouts {
        SenderTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            io: Duration::from_secs(self.io_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiverConfig {
    pub accept_timeout_secs: u64,
    pub connection_timeout_secs: u64,
    /// Where received archives are stored.
    pub destination: PathBuf,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            accept_timeout_secs: 300,
            connection_timeout_secs: 900,
            destination: PathBuf::from("/mnt/us/documents/Manga"),
        }
    }
}

impl ReceiverConfig {
    pub fn timeouts(&self) -> ReceiverTimeouts {
        ReceiverTimeouts {
            accept: Duration::from_secs(self.accept_timeout_secs),
            connection: Duration::from_secs(self.connection_timeout_secs),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of transform workers.
    /// When absent, one less than the number of CPU cores.
    /// Larger values are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → `cores − 1` (at least 1)
/// - `Some(n)` → `min(n, cores − 1)`, at least 1 (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let available = default_workers();
    config
        .max_processes
        .map(|n| n.min(available))
        .unwrap_or(available)
        .max(1)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// A missing file yields the stock defaults; an unreadable, malformed or
/// invalid one is an error.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `m4k.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# m4k Configuration
# =================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Command-line flags override these values.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Reading device
# ---------------------------------------------------------------------------
[device]
# Output page size in pixels (defaults: Kindle Paperwhite).
width = 1236
height = 1648

# Page encoding: "jpeg" or "png".
encoding = "jpeg"

# JPEG quality (1-100). Ignored for png.
quality = 75

# Landscape pages (two-page spreads) are rendered double-wide by default.
# Set to true to rotate them to portrait instead.
rotate = false

# ---------------------------------------------------------------------------
# Upload (m4k build --upload)
# ---------------------------------------------------------------------------
[transfer]
# Port appended to addresses given without one.
port = 49494

# Seconds to wait for the connection to open.
connect_timeout_secs = 10

# Seconds allowed for the whole upload.
io_timeout_secs = 600

# ---------------------------------------------------------------------------
# Receiver (m4k-receiver, on the device)
# ---------------------------------------------------------------------------
[receiver]
# Seconds to wait for a sender before exiting.
accept_timeout_secs = 300

# Seconds allowed for the whole transfer once connected.
connection_timeout_secs = 900

# Directory received archives are stored in.
destination = "/mnt/us/documents/Manga"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel page transforms. Omit for auto (CPU cores - 1).
# Values above that are clamped down.
# max_processes = 4
"##
}
