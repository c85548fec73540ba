//! Synthetic device for running the bridge without hardware
//!
//! A generator thread produces one timestamped line per interval and pushes
//! it into a bounded queue. When the queue is full the new line is dropped;
//! lines already queued are kept and read back in order.

use super::{closed_error, DeviceStream};
use crate::constants::SIM_LINE_PREFIX;
use bytes::Bytes;
use chrono::SecondsFormat;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

struct Queue {
    items: VecDeque<Bytes>,
    capacity: usize,
    closed: bool,
}

impl Queue {
    /// Enqueue unless full; returns false when the item was dropped
    fn offer(&mut self, item: Bytes) -> bool {
        if self.items.len() >= self.capacity {
            return false;
        }
        self.items.push_back(item);
        true
    }
}

struct Shared {
    queue: Mutex<Queue>,
    /// Signalled on new data and on close
    changed: Condvar,
}

/// Device producing `"Simulated Serial Output <timestamp>\r\n"` periodically
///
/// Writes are logged and counted but go nowhere.
pub struct SyntheticSource {
    shared: Arc<Shared>,
    bytes_written: AtomicU64,
}

impl SyntheticSource {
    /// Start a source generating one line every `interval`, keeping at most
    /// `capacity` unread lines
    pub fn with_settings(interval: Duration, capacity: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            changed: Condvar::new(),
        });

        let generator = shared.clone();
        thread::Builder::new()
            .name("tty-bridge-sim".to_string())
            .spawn(move || run_generator(&generator, interval))?;

        Ok(Self {
            shared,
            bytes_written: AtomicU64::new(0),
        })
    }

    /// Total bytes passed to `write`
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.shared.queue.lock().items.len()
    }

    #[cfg(test)]
    fn offer(&self, item: Bytes) -> bool {
        let accepted = self.shared.queue.lock().offer(item);
        if accepted {
            self.shared.changed.notify_all();
        }
        accepted
    }
}

fn run_generator(shared: &Shared, interval: Duration) {
    let mut next_tick = Instant::now() + interval;
    let mut queue = shared.queue.lock();

    loop {
        while !queue.closed && Instant::now() < next_tick {
            shared.changed.wait_until(&mut queue, next_tick);
        }
        if queue.closed {
            return;
        }
        next_tick += interval;

        if queue.offer(generate_line()) {
            shared.changed.notify_all();
        } else {
            trace!("Simulator queue full, dropping line");
        }
    }
}

fn generate_line() -> Bytes {
    let timestamp = chrono::Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    Bytes::from(format!("{}{}\r\n", SIM_LINE_PREFIX, timestamp))
}

impl DeviceStream for SyntheticSource {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.shared.queue.lock();
        loop {
            if queue.closed {
                return Err(closed_error());
            }
            if buf.is_empty() {
                return Ok(0);
            }
            if let Some(item) = queue.items.pop_front() {
                let n = item.len().min(buf.len());
                buf[..n].copy_from_slice(&item[..n]);
                if n < item.len() {
                    queue.items.push_front(item.slice(n..));
                }
                return Ok(n);
            }
            self.shared.changed.wait(&mut queue);
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        info!("[SIM] Serial write: {}", String::from_utf8_lossy(data));
        self.bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data.len())
    }

    fn close(&self) -> io::Result<()> {
        let mut queue = self.shared.queue.lock();
        if queue.closed {
            return Ok(());
        }
        queue.closed = true;
        drop(queue);

        self.shared.changed.notify_all();
        debug!("Simulator closed ({} bytes written)", self.bytes_written());
        Ok(())
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
