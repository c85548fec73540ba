//! Debug wrapper tracing every read and write of a device
//!
//! Return values, errors and blocking behavior of the wrapped device are
//! passed through untouched.

use super::DeviceStream;
use std::io;
use tracing::info;

/// Device wrapper emitting a trace record per read/write
pub struct LoggingDevice<D> {
    inner: D,
}

impl<D: DeviceStream> LoggingDevice<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DeviceStream> DeviceStream for LoggingDevice<D> {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let result = self.inner.read(buf);
        match &result {
            Ok(n) if *n > 0 => {
                info!("[SERIAL DEBUG] Read {} bytes: \"{}\"", n, buf[..*n].escape_ascii());
            }
            Ok(_) => {}
            Err(e) => info!("[SERIAL DEBUG] Read error: {}", e),
        }
        result
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        info!(
            "[SERIAL DEBUG] Write {} bytes: \"{}\"",
            data.len(),
            data.escape_ascii()
        );
        self.inner.write(data)
    }

    fn close(&self) -> io::Result<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use proptest::prelude::*;
    use std::sync::Arc;

    /// Reads and writes a script against a device, recording every outcome
    fn exercise(
        device: &dyn DeviceStream,
        reads: usize,
        writes: &[Vec<u8>],
    ) -> Vec<std::result::Result<Vec<u8>, io::ErrorKind>> {
        let mut outcomes = Vec::new();
        for data in writes {
            outcomes.push(device.write(data).map(|n| vec![n as u8]).map_err(|e| e.kind()));
        }
        let mut buf = [0u8; 256];
        for _ in 0..reads {
            outcomes.push(
                device
                    .read(&mut buf)
                    .map(|n| buf[..n].to_vec())
                    .map_err(|e| e.kind()),
            );
        }
        outcomes
    }

    fn scripted(reads: &[Option<Vec<u8>>]) -> MockDevice {
        let mock = MockDevice::new();
        for read in reads {
            match read {
                Some(data) => mock.push_read(data),
                None => mock.push_read_error(io::ErrorKind::BrokenPipe),
            }
        }
        mock
    }

    proptest! {
        #[test]
        fn prop_wrapping_is_observation_only(
            reads in prop::collection::vec(
                prop::option::weighted(0.8, prop::collection::vec(any::<u8>(), 1..64)),
                0..8,
            ),
            writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8),
        ) {
            let plain = scripted(&reads);
            let wrapped = LoggingDevice::new(scripted(&reads));

            let expected = exercise(&plain, reads.len(), &writes);
            let actual = exercise(&wrapped, reads.len(), &writes);

            prop_assert_eq!(expected, actual);
            prop_assert_eq!(plain.writes(), wrapped.into_inner().writes());
        }
    }

    #[test]
    fn test_close_passes_through() {
        let mock = Arc::new(MockDevice::new());
        let device = LoggingDevice::new(mock.clone());

        device.close().unwrap();
        assert_eq!(mock.close_count(), 1);

        let mut buf = [0u8; 4];
        let err = device.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(device.write(b"x").is_err());
    }
}
