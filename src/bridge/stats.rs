//! Traffic statistics for a bridge session
//!
//! Lock-free counters shared by the two forwarding loops.

use super::shutdown::StopReason;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session counters (fully lock-free)
#[derive(Default)]
pub struct Stats {
    /// Bytes written to the device (remote -> device)
    device_bytes: AtomicU64,
    /// Frames written to the device
    device_frames: AtomicU64,
    /// Bytes sent to the remote (device -> remote)
    remote_bytes: AtomicU64,
    /// Frames sent to the remote
    remote_frames: AtomicU64,
    /// Inbound frames dropped because of their kind
    ignored_frames: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one payload written to the device
    #[inline]
    pub fn add_to_device(&self, bytes: usize) {
        self.device_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.device_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one frame sent to the remote
    #[inline]
    pub fn add_to_remote(&self, bytes: usize) {
        self.remote_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.remote_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one inbound frame of an ignored kind
    #[inline]
    pub fn add_ignored(&self) {
        self.ignored_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Freeze the counters into a summary
    pub fn summary(&self, stopped_by: Option<StopReason>) -> SessionSummary {
        SessionSummary {
            device_bytes: self.device_bytes.load(Ordering::Relaxed),
            device_frames: self.device_frames.load(Ordering::Relaxed),
            remote_bytes: self.remote_bytes.load(Ordering::Relaxed),
            remote_frames: self.remote_frames.load(Ordering::Relaxed),
            ignored_frames: self.ignored_frames.load(Ordering::Relaxed),
            stopped_by,
        }
    }
}

/// What a finished session did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub device_bytes: u64,
    pub device_frames: u64,
    pub remote_bytes: u64,
    pub remote_frames: u64,
    pub ignored_frames: u64,
    /// Side that stopped the session first
    pub stopped_by: Option<StopReason>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "to device {} B in {} frames, to remote {} B in {} frames, {} ignored",
            self.device_bytes,
            self.device_frames,
            self.remote_bytes,
            self.remote_frames,
            self.ignored_frames
        )?;
        if let Some(reason) = self.stopped_by {
            write!(f, ", stopped by {}", reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = Stats::new();
        stats.add_to_device(7);
        stats.add_to_device(3);
        stats.add_to_remote(1024);
        stats.add_ignored();

        let summary = stats.summary(Some(StopReason::Remote));
        assert_eq!(summary.device_bytes, 10);
        assert_eq!(summary.device_frames, 2);
        assert_eq!(summary.remote_bytes, 1024);
        assert_eq!(summary.remote_frames, 1);
        assert_eq!(summary.ignored_frames, 1);
        assert_eq!(summary.stopped_by, Some(StopReason::Remote));
    }

    #[test]
    fn test_summary_display() {
        let summary = Stats::new().summary(Some(StopReason::Device));
        assert_eq!(
            summary.to_string(),
            "to device 0 B in 0 frames, to remote 0 B in 0 frames, 0 ignored, stopped by device"
        );
    }
}
