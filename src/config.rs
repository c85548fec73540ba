//! Configuration management
//!
//! Settings come from built-in defaults, an optional TOML file
//! (`--config PATH`) and command-line flags, in increasing priority.
//!
//! ```toml
//! [bridge]
//! device_id = "bench-01"
//! server_addr = "tty.example.net:80"
//! append_newline = true
//!
//! [device]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//! ```

use crate::cli::Cli;
use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT, DEFAULT_SERVER_ADDR, DEFAULT_SIM_CAPACITY,
    DEFAULT_SIM_INTERVAL_MS, FALLBACK_DEVICE_ID,
};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub device: DeviceConfig,
}

// =============================================================================
// Remote side
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Identifier sent to the server (defaults to the host name)
    pub device_id: String,

    /// Server address as host:port
    pub server_addr: String,

    /// Append `\r\n` to every payload received from the server
    pub append_newline: bool,

    /// Log every WebSocket frame
    pub debug_transport: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            append_newline: false,
            debug_transport: false,
        }
    }
}

// =============================================================================
// Device side
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial device path
    pub port: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Use the synthetic source instead of a serial port
    pub simulate: bool,

    /// Log every device read/write
    pub debug_serial: bool,

    /// Synthetic line interval (milliseconds)
    pub sim_interval_ms: u64,

    /// Synthetic lines kept while nobody reads
    pub sim_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            simulate: false,
            debug_serial: false,
            sim_interval_ms: DEFAULT_SIM_INTERVAL_MS,
            sim_capacity: DEFAULT_SIM_CAPACITY,
        }
    }
}

impl Config {
    /// Build the effective configuration for a command line
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => load(path)?,
            None => Config::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Override file/default values with flags given on the command line
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(id) = &cli.id {
            self.bridge.device_id = id.clone();
        }
        if let Some(addr) = &cli.addr {
            self.bridge.server_addr = addr.clone();
        }
        if let Some(port) = &cli.port {
            self.device.port = port.clone();
        }
        if let Some(baud) = cli.baud {
            self.device.baud_rate = baud;
        }
        self.device.simulate |= cli.sim;
        self.bridge.debug_transport |= cli.debug_ws;
        self.device.debug_serial |= cli.debug_serial;
        self.bridge.append_newline |= cli.append_newline;
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |field, reason: &str| {
            Err(BridgeError::ConfigValidation {
                field,
                reason: reason.to_string(),
            })
        };

        if self.bridge.device_id.is_empty() {
            return invalid("device_id", "must not be empty");
        }
        if self.bridge.server_addr.is_empty() {
            return invalid("server_addr", "must not be empty");
        }
        if self.device.simulate {
            if self.device.sim_interval_ms == 0 {
                return invalid("sim_interval_ms", "must be positive");
            }
            if self.device.sim_capacity == 0 {
                return invalid("sim_capacity", "must be positive");
            }
        } else {
            if self.device.port.is_empty() {
                return invalid("port", "must not be empty");
            }
            if self.device.baud_rate == 0 {
                return invalid("baud_rate", "must be positive");
            }
        }
        Ok(())
    }
}

/// Load config from a TOML file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| BridgeError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })
}

/// Host name, or a fixed placeholder when it cannot be determined
pub fn default_device_id() -> String {
    hostname().unwrap_or_else(|| FALLBACK_DEVICE_ID.to_string())
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY:
    // - buf is a valid mutable buffer with known size
    // - gethostname writes at most buf.len() bytes
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return None;
    }

    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).into_owned();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .filter(|name| !name.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
