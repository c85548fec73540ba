//! One-shot shutdown signal shared by the forwarding loops
//!
//! Any holder can raise it; only the first raise is recorded. Loops check it
//! before each blocking call and race their blocking calls against it.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Why a bridge session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// WebSocket receive/send failed or the peer closed the connection
    Remote,
    /// Device read/write failed
    Device,
    /// Stop requested by the owner (e.g. Ctrl-C)
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Device => write!(f, "device"),
            Self::Requested => write!(f, "requested"),
        }
    }
}

/// Cloneable handle to a single shutdown signal
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<StopReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal
    ///
    /// Returns `true` if this call raised it, `false` if it was already up.
    pub fn raise(&self, reason: StopReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    /// Non-blocking check
    pub fn is_raised(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Reason given by the first raise
    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    /// Wait until the signal is raised (returns immediately if it already is)
    pub async fn raised(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(Option::is_some).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
