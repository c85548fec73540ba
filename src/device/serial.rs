//! Serial port device (hardware adapter)
//!
//! The port is opened once and cloned into a read handle and a write handle,
//! each behind its own lock, so the bridge reader and writer never contend.
//!
//! The port uses a short timeout internally. `read` loops over timeouts until
//! data arrives, which lets it notice `close()` within one timeout period
//! instead of blocking forever on an idle line.

use super::{closed_error, DeviceStream};
use crate::constants::{SERIAL_DISCONNECT_THRESHOLD, SERIAL_READ_TIMEOUT_MS};
use crate::error::{BridgeError, Result};
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Real serial device
///
/// # Example
///
/// ```ignore
/// let device = SerialDevice::open("/dev/ttyUSB0", 115_200)?;
/// device.write_all(b"AT\r\n")?;
/// ```
pub struct SerialDevice {
    port_name: String,
    reader: Mutex<Option<Box<dyn SerialPort>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    closed: AtomicBool,
}

impl SerialDevice {
    /// Open `port_name` at `baud_rate` (8N1, no flow control)
    ///
    /// # Errors
    ///
    /// - `SerialOpen` - path invalid, device missing or already in use
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let map_err = |e: serialport::Error| BridgeError::SerialOpen {
            port: port_name.to_string(),
            source: e.into(),
        };

        let reader = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(map_err)?;
        let writer = reader.try_clone().map_err(map_err)?;

        debug!("Opened serial port {} @ {} baud", port_name, baud_rate);

        Ok(Self {
            port_name: port_name.to_string(),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl DeviceStream for SerialDevice {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut guard = self.reader.lock();
        read_until_data(&mut *guard, buf, || self.is_closed())
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut guard = self.writer.lock();

        loop {
            if self.is_closed() {
                return Err(closed_error());
            }
            let port = guard.as_mut().ok_or_else(closed_error)?;

            match port.write(data) {
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                result => return result,
            }
        }
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Both loops re-check the flag after at most one timeout,
        // so these locks are released promptly.
        drop(self.writer.lock().take());
        drop(self.reader.lock().take());
        debug!("Closed serial port {}", self.port_name);
        Ok(())
    }
}

impl Drop for SerialDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Read loop over a port with a short timeout
///
/// Timeouts are retried and `is_closed` is checked between attempts. More
/// than `SERIAL_DISCONNECT_THRESHOLD` consecutive empty reads mean the port
/// is gone.
fn read_until_data<R>(
    port: &mut Option<Box<R>>,
    buf: &mut [u8],
    is_closed: impl Fn() -> bool,
) -> io::Result<usize>
where
    R: Read + ?Sized,
{
    let mut zero_reads = 0u32;

    loop {
        if is_closed() {
            return Err(closed_error());
        }
        let port = port.as_mut().ok_or_else(closed_error)?;

        match port.read(buf) {
            Ok(0) => {
                // Zero bytes read - could be normal or port gone
                zero_reads += 1;
                if zero_reads > SERIAL_DISCONNECT_THRESHOLD {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port disconnected",
                    ));
                }
            }
            Ok(n) => return Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => zero_reads = 0,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_invalid_path() {
        match SerialDevice::open("/dev/does-not-exist-tty", 115_200) {
            Err(BridgeError::SerialOpen { port, source }) => {
                assert_eq!(port, "/dev/does-not-exist-tty");
                assert!(!source.to_string().is_empty());
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing device must fail"),
        }
    }

    #[test]
    fn test_open_empty_path() {
        assert!(SerialDevice::open("", 9600).is_err());
    }

    /// Port returning scripted results, then timing out forever
    struct ScriptedPort(Vec<io::Result<usize>>);

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "idle"));
            }
            let next = self.0.remove(0)?;
            buf[..next].fill(b'x');
            Ok(next)
        }
    }

    fn scripted(results: Vec<io::Result<usize>>) -> Option<Box<ScriptedPort>> {
        Some(Box::new(ScriptedPort(results)))
    }

    #[test]
    fn test_timeouts_are_retried() {
        let timeout = || Err(io::Error::new(io::ErrorKind::TimedOut, "t"));
        let mut port = scripted(vec![timeout(), timeout(), Ok(3)]);
        let mut buf = [0u8; 8];

        assert_eq!(read_until_data(&mut port, &mut buf, || false).unwrap(), 3);
        assert_eq!(&buf[..3], b"xxx");
    }

    #[test]
    fn test_repeated_zero_reads_mean_disconnect() {
        let zeros = (0..=SERIAL_DISCONNECT_THRESHOLD).map(|_| Ok(0)).collect();
        let mut port = scripted(zeros);
        let mut buf = [0u8; 8];

        let err = read_until_data(&mut port, &mut buf, || false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_timeout_resets_zero_read_count() {
        let mut results: Vec<io::Result<usize>> =
            (0..SERIAL_DISCONNECT_THRESHOLD).map(|_| Ok(0)).collect();
        results.push(Err(io::Error::new(io::ErrorKind::TimedOut, "t")));
        results.extend((0..SERIAL_DISCONNECT_THRESHOLD).map(|_| Ok(0)));
        results.push(Ok(2));
        let mut port = scripted(results);
        let mut buf = [0u8; 8];

        assert_eq!(read_until_data(&mut port, &mut buf, || false).unwrap(), 2);
    }

    #[test]
    fn test_closed_flag_stops_idle_read() {
        let mut port = scripted(Vec::new());
        let mut buf = [0u8; 8];
        let polls = std::cell::Cell::new(0);

        let err = read_until_data(&mut port, &mut buf, || {
            polls.set(polls.get() + 1);
            polls.get() > 3
        })
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_read_error_is_returned() {
        let mut port = scripted(vec![Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))]);
        let mut buf = [0u8; 8];

        let err = read_until_data(&mut port, &mut buf, || false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

#[cfg(all(test, unix))]
mod pty_tests {
    use super::*;
    use serialport::TTYPort;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    /// Device opened on the slave side of a pseudo terminal
    ///
    /// Both pty ends are returned so the line stays up for the test.
    fn pty_device() -> (TTYPort, TTYPort, SerialDevice) {
        let (master, slave) = TTYPort::pair().unwrap();
        let path = slave.name().unwrap();
        let device = SerialDevice::open(&path, 115_200).unwrap();
        (master, slave, device)
    }

    #[test]
    fn test_read_and_write_through_pty() {
        let (mut master, _slave, device) = pty_device();

        master.write_all(b"hi").unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        while received.len() < 2 {
            let n = device.read(&mut buf).unwrap();
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"hi");

        device.write_all(b"ok\r\n").unwrap();
        let mut echoed = [0u8; 4];
        master.read_exact(&mut echoed).unwrap();
        assert_eq!(&echoed, b"ok\r\n");
    }

    #[test]
    fn test_close_unblocks_parked_read() {
        let (_master, _slave, device) = pty_device();
        let device = Arc::new(device);

        let reader = device.clone();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 16];
            reader.read(&mut buf)
        });

        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        device.close().unwrap();
        let err = handle.join().unwrap().unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_closed_device_fails_every_call() {
        let (_master, _slave, device) = pty_device();
        device.close().unwrap();
        device.close().unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(device.read(&mut buf).unwrap_err().kind(), io::ErrorKind::NotConnected);
        assert_eq!(device.read(&mut []).unwrap_err().kind(), io::ErrorKind::NotConnected);
        assert_eq!(device.write(b"x").unwrap_err().kind(), io::ErrorKind::NotConnected);
    }
}
