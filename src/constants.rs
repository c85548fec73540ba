//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Remote
// =============================================================================

/// Default remote server address (host:port)
pub const DEFAULT_SERVER_ADDR: &str = "localhost:80";

/// URI scheme of the remote transport
pub const ENDPOINT_SCHEME: &str = "ws";

/// Path of the device endpoint on the remote server
pub const ENDPOINT_PATH: &str = "/ws/device";

/// Query parameter carrying the device identifier
pub const DEVICE_ID_PARAM: &str = "id";

/// Time allowed for the closing handshake when a session ends (milliseconds)
pub const CLOSE_TIMEOUT_MS: u64 = 1000;

/// Device identifier used when the host name cannot be determined
pub const FALLBACK_DEVICE_ID: &str = "unknown-device";

// =============================================================================
// Serial
// =============================================================================

/// Default serial device path
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Port read timeout; bounds how long a reader can miss a close (milliseconds)
pub const SERIAL_READ_TIMEOUT_MS: u64 = 10;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// Synthetic source
// =============================================================================

/// Interval between generated lines (milliseconds)
pub const DEFAULT_SIM_INTERVAL_MS: u64 = 2000;

/// Maximum number of generated lines waiting to be read
pub const DEFAULT_SIM_CAPACITY: usize = 10;

/// Prefix of every generated line
pub const SIM_LINE_PREFIX: &str = "Simulated Serial Output ";

// =============================================================================
// Buffers
// =============================================================================

/// Device read buffer size (one outbound frame per read, at most this long)
pub const DEVICE_READ_BUFFER_SIZE: usize = 1024;

/// Suffix appended to inbound payloads when newline appending is enabled
pub const LINE_ENDING: &[u8] = b"\r\n";
