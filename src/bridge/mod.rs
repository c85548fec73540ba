//! Bridge between a remote WebSocket peer and a local device
//!
//! The bridge owns one device and one WebSocket connection and relays bytes
//! in both directions:
//! - **Inbound** (remote -> device): binary/text frames are written to the
//!   device, optionally followed by `\r\n`. A close frame ends the session;
//!   other frames are ignored.
//! - **Outbound** (device -> remote): each non-empty device read is sent as
//!   exactly one binary frame.
//!
//! Both loops share a [`Shutdown`] signal. Whichever loop fails first raises
//! it and the other stops before (or while) its next blocking call. Device
//! and connection are closed once, when `start()` returns.
//!
//! # Example
//!
//! ```ignore
//! let device = device::open(&config.device)?;
//! let mut bridge = Bridge::new(device, BridgeOptions::default());
//! bridge.connect("localhost:80", "bench-01").await?;
//! let summary = bridge.start().await?;
//! ```

pub mod endpoint;
pub mod frame;
pub mod shutdown;
pub mod stats;

pub use shutdown::{Shutdown, StopReason};
pub use stats::{SessionSummary, Stats};

use self::frame::FrameKind;
use crate::config::BridgeConfig;
use crate::constants::{CLOSE_TIMEOUT_MS, DEVICE_READ_BUFFER_SIZE};
use crate::device::DeviceStream;
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// WebSocket connection to the remote server
pub type Connection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Forwarding behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeOptions {
    /// Append `\r\n` to every inbound payload
    pub append_newline: bool,
    /// Trace every frame received and sent
    pub debug_transport: bool,
}

impl From<&BridgeConfig> for BridgeOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            append_newline: config.append_newline,
            debug_transport: config.debug_transport,
        }
    }
}

/// Device <-> WebSocket bridge
///
/// Lifecycle: `new` -> `connect` -> `start` (consumes the bridge).
pub struct Bridge {
    device: Arc<dyn DeviceStream>,
    connection: Option<Connection>,
    options: BridgeOptions,
    shutdown: Shutdown,
    stats: Arc<Stats>,
}

impl Bridge {
    pub fn new(device: Arc<dyn DeviceStream>, options: BridgeOptions) -> Self {
        Self {
            device,
            connection: None,
            options,
            shutdown: Shutdown::new(),
            stats: Arc::new(Stats::new()),
        }
    }

    /// Handle to stop the session from outside (e.g. on Ctrl-C)
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Open the WebSocket connection for `device_id` on `server_addr`
    ///
    /// # Errors
    ///
    /// - `Connect` - server unreachable or handshake rejected (not retried)
    pub async fn connect(&mut self, server_addr: &str, device_id: &str) -> Result<()> {
        let url = endpoint::device_url(server_addr, device_id);
        info!("Connecting to {}", url);

        let (connection, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| BridgeError::Connect {
                url: url.clone(),
                source: Box::new(e),
            })?;

        self.connection = Some(connection);
        Ok(())
    }

    /// Relay data until either side stops, then close device and connection
    ///
    /// Forwarding errors end the session but are not returned; they are
    /// logged and reflected in [`SessionSummary::stopped_by`]. The device is
    /// closed on every way out of this call, including an early error and
    /// the returned future being dropped.
    ///
    /// # Errors
    ///
    /// - `NotConnected` - `connect()` was not called or failed
    pub async fn start(mut self) -> Result<SessionSummary> {
        let mut guard = SessionGuard {
            device: self.device.clone(),
            shutdown: self.shutdown.clone(),
            device_closed: false,
        };
        let connection = self.connection.take().ok_or(BridgeError::NotConnected)?;
        let Bridge {
            device,
            options,
            shutdown,
            stats,
            ..
        } = self;
        let (sink, stream) = connection.split();

        let forwarder = Forwarder {
            device,
            shutdown: shutdown.clone(),
            stats: stats.clone(),
            options,
        };

        let inbound = tokio::spawn(forwarder.clone().inbound(stream));
        let sink = forwarder.outbound(sink).await;

        guard.close_device();
        close_connection(sink, inbound).await;

        let summary = stats.summary(shutdown.reason());
        info!("Session ended: {}", summary);
        Ok(summary)
    }
}

/// Owns the device close for one `start()` call
///
/// Dropped before `close_device` ran (early return, cancelled future), it
/// raises the shutdown so a detached inbound task lets go of the connection,
/// then closes the device. A blocked device read fails once the device is
/// closed.
struct SessionGuard {
    device: Arc<dyn DeviceStream>,
    shutdown: Shutdown,
    device_closed: bool,
}

impl SessionGuard {
    fn close_device(&mut self) {
        if std::mem::replace(&mut self.device_closed, true) {
            return;
        }
        if let Err(e) = self.device.close() {
            warn!("Serial close error: {}", e);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.device_closed {
            self.shutdown.raise(StopReason::Requested);
            self.close_device();
        }
    }
}

/// Send a Close frame (bounded wait) and let the inbound task finish
async fn close_connection<K>(mut sink: K, inbound: JoinHandle<()>)
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    match tokio::time::timeout(Duration::from_millis(CLOSE_TIMEOUT_MS), sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("WebSocket close: {}", e),
        Err(_) => debug!("WebSocket close timed out"),
    }

    if let Err(e) = inbound.await {
        warn!("Inbound task failed: {}", e);
    }
}

/// State shared by the two forwarding loops
#[derive(Clone)]
struct Forwarder {
    device: Arc<dyn DeviceStream>,
    shutdown: Shutdown,
    stats: Arc<Stats>,
    options: BridgeOptions,
}

impl Forwarder {
    /// Remote -> device
    async fn inbound<S>(self, mut stream: S)
    where
        S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.raised() => return,
                next = stream.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!("WebSocket read error: {}", e);
                    self.stop(StopReason::Remote);
                    return;
                }
                None => {
                    info!("WebSocket closed by remote");
                    self.stop(StopReason::Remote);
                    return;
                }
            };

            if let Message::Close(close) = &message {
                match close {
                    Some(close) => info!("WebSocket closed by remote: {}", close),
                    None => info!("WebSocket closed by remote"),
                }
                self.stop(StopReason::Remote);
                return;
            }

            let kind = FrameKind::of(&message);
            let Some(payload) = frame::device_payload(message, self.options.append_newline) else {
                if self.options.debug_transport {
                    info!("[WS DEBUG] Ignoring {} message", kind);
                }
                self.stats.add_ignored();
                continue;
            };

            if self.options.debug_transport {
                info!(
                    "[WS DEBUG] Forwarding {} message, {} bytes to serial: \"{}\"",
                    kind,
                    payload.len(),
                    payload.escape_ascii()
                );
            }

            let len = payload.len();
            let device = self.device.clone();
            let write = tokio::task::spawn_blocking(move || device.write_all(&payload));

            let result = tokio::select! {
                biased;
                _ = self.shutdown.raised() => return,
                result = write => result,
            };

            match result {
                Ok(Ok(())) => self.stats.add_to_device(len),
                Ok(Err(e)) => {
                    warn!("Serial write error: {}", e);
                    self.stop(StopReason::Device);
                    return;
                }
                Err(e) => {
                    warn!("Serial write task failed: {}", e);
                    self.stop(StopReason::Device);
                    return;
                }
            }
        }
    }

    /// Device -> remote; hands the sink back so the caller can close it
    async fn outbound<K>(self, mut sink: K) -> K
    where
        K: Sink<Message, Error = WsError> + Unpin,
    {
        let mut buf = vec![0u8; DEVICE_READ_BUFFER_SIZE];

        loop {
            if self.shutdown.is_raised() {
                return sink;
            }

            let device = self.device.clone();
            let read = tokio::task::spawn_blocking(move || {
                let result = device.read(&mut buf);
                (buf, result)
            });

            // A read still blocked here is released by the device close.
            let (returned, result) = tokio::select! {
                biased;
                _ = self.shutdown.raised() => return sink,
                joined = read => match joined {
                    Ok(done) => done,
                    Err(e) => {
                        warn!("Serial read task failed: {}", e);
                        self.stop(StopReason::Device);
                        return sink;
                    }
                },
            };
            buf = returned;

            let n = match result {
                Ok(0) => continue,
                Ok(n) => n,
                Err(e) => {
                    warn!("Serial read error: {}", e);
                    self.stop(StopReason::Device);
                    return sink;
                }
            };

            if self.options.debug_transport {
                info!("[WS DEBUG] Writing message: \"{}\"", buf[..n].escape_ascii());
            }

            let frame = Message::Binary(Bytes::copy_from_slice(&buf[..n]));
            if let Err(e) = sink.send(frame).await {
                warn!("WebSocket write error: {}", e);
                self.stop(StopReason::Remote);
                return sink;
            }
            self.stats.add_to_remote(n);
        }
    }

    fn stop(&self, reason: StopReason) {
        if self.shutdown.raise(reason) {
            debug!("Shutdown raised ({})", reason);
        }
    }
}
