//! tty-bridge - expose a local serial line to a remote WebSocket server
//!
//! ```text
//! Server ──WebSocket──► tty-bridge ──Serial──► Device
//! ```

pub mod bridge;
pub mod cli;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod logging;

pub use bridge::{Bridge, BridgeOptions, SessionSummary, Shutdown, StopReason};
pub use device::DeviceStream;
pub use error::{BridgeError, Result};
