//! Device stream abstraction for byte-level serial I/O
//!
//! Separates the device side of the bridge from the remote side:
//! - **Device stream**: where serial bytes come from and go to
//!   (real port, synthetic generator, logging wrapper...)
//! - **Bridge**: how those bytes are relayed to the remote peer
//!
//! Every implementation uses blocking calls and takes `&self`, so one
//! reader thread and one writer thread can share a device through an `Arc`.
//! The bridge guarantees at most one reader and one writer at a time.
//!
//! # Adding a new device
//!
//! 1. Create `device/my_device.rs`
//! 2. Implement the `DeviceStream` trait
//! 3. Add `pub mod my_device;` here and a branch in [`open`]

pub mod logging;
pub mod serial;
pub mod synthetic;

pub use logging::LoggingDevice;
pub use serial::SerialDevice;
pub use synthetic::SyntheticSource;

use crate::config::DeviceConfig;
use crate::error::{BridgeError, Result};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Byte stream over a serial line (physical or simulated)
///
/// # Contract
///
/// - `read` blocks until at least one byte is available, the stream fails,
///   or the stream is closed. A closed stream returns an error, never `Ok(0)`
///   for a non-empty buffer.
/// - `write` blocks until the bytes are queued or transmitted and returns
///   how many were accepted.
/// - `close` makes any in-flight and future `read`/`write` fail promptly.
pub trait DeviceStream: Send + Sync {
    /// Read available bytes into `buf`
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes, returning how many were accepted
    fn write(&self, data: &[u8]) -> io::Result<usize>;

    /// Close the stream and unblock pending reads
    fn close(&self) -> io::Result<()>;

    /// Write the whole buffer, retrying short writes
    fn write_all(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "device accepted no bytes",
                    ))
                }
                n => data = &data[n..],
            }
        }
        Ok(())
    }
}

impl<D: DeviceStream + ?Sized> DeviceStream for Box<D> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

impl<D: DeviceStream + ?Sized> DeviceStream for Arc<D> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

/// Error returned by every operation on a closed device
pub fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "device closed")
}

/// Open the device described by the configuration
///
/// Picks the synthetic source or the serial port, then wraps it in a
/// [`LoggingDevice`] when serial debugging is enabled.
///
/// # Errors
///
/// - `SerialOpen` - the port path is invalid, missing or busy
/// - `Simulator` - the generator thread could not be started
pub fn open(config: &DeviceConfig) -> Result<Arc<dyn DeviceStream>> {
    let device: Box<dyn DeviceStream> = if config.simulate {
        info!("Mode: Simulation");
        let source = SyntheticSource::with_settings(
            Duration::from_millis(config.sim_interval_ms),
            config.sim_capacity,
        )
        .map_err(|source| BridgeError::Simulator { source })?;
        Box::new(source)
    } else {
        info!("Mode: Real Serial ({} @ {})", config.port, config.baud_rate);
        Box::new(SerialDevice::open(&config.port, config.baud_rate)?)
    };

    if config.debug_serial {
        Ok(Arc::new(LoggingDevice::new(device)))
    } else {
        Ok(Arc::from(device))
    }
}
