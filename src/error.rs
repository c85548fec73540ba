//! Centralized error types for the bridge
//!
//! All startup errors are represented by the `BridgeError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, BridgeError>`.
//!
//! Forwarding errors (once a session runs) are not represented here: they
//! end the loop that hit them and are only reported through tracing.

use std::fmt;
use std::path::PathBuf;

/// All bridge errors
#[derive(Debug)]
pub enum BridgeError {
    // === Device ===
    /// Failed to open serial port
    SerialOpen {
        port: String,
        source: std::io::Error,
    },
    /// Failed to start the synthetic data generator
    Simulator { source: std::io::Error },

    // === Remote ===
    /// WebSocket handshake with the remote server failed
    Connect {
        url: String,
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// `start()` called before a successful `connect()`
    NotConnected,

    // === Config ===
    /// Failed to read config file
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerialOpen { source, .. }
            | Self::Simulator { source }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            Self::Connect { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialOpen { port, source } => {
                write!(f, "Cannot open serial port {}: {}", port, source)
            }
            Self::Simulator { source } => write!(f, "Cannot start simulator: {}", source),
            Self::Connect { url, source } => write!(f, "Cannot connect to {}: {}", url, source),
            Self::NotConnected => write!(f, "Bridge is not connected"),
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
