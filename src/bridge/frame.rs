//! Inbound WebSocket frame handling
//!
//! Binary and text frames carry serial data and are forwarded identically.
//! Ping, pong and raw frames are dropped silently. A close frame ends the
//! session; the bridge checks for it before asking for a payload.

use crate::constants::LINE_ENDING;
use bytes::{Bytes, BytesMut};
use std::fmt;
use tokio_tungstenite::tungstenite::Message;

/// Kind tag of a WebSocket message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Binary,
    Text,
    Other,
}

impl FrameKind {
    pub fn of(message: &Message) -> Self {
        match message {
            Message::Binary(_) => Self::Binary,
            Message::Text(_) => Self::Text,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Bytes to write to the device for `message`
///
/// Returns `None` for frame kinds that are not forwarded. With
/// `append_newline`, `\r\n` is appended to the payload.
pub fn device_payload(message: Message, append_newline: bool) -> Option<Bytes> {
    let payload = match message {
        Message::Binary(data) => data,
        Message::Text(text) => Bytes::copy_from_slice(text.as_str().as_bytes()),
        _ => return None,
    };

    if !append_newline {
        return Some(payload);
    }

    let mut buf = BytesMut::with_capacity(payload.len() + LINE_ENDING.len());
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(LINE_ENDING);
    Some(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_text_hello_with_newline() {
        let payload = device_payload(Message::text("hello"), true).unwrap();
        assert_eq!(payload.as_ref(), b"hello\r\n");
        assert_eq!(payload.len(), 7);
    }

    #[test]
    fn test_binary_passthrough() {
        let payload = device_payload(Message::binary(vec![0x00, 0xff, 0x0d]), false).unwrap();
        assert_eq!(payload.as_ref(), &[0x00, 0xff, 0x0d]);
    }

    #[test]
    fn test_control_frames_ignored() {
        assert!(device_payload(Message::Ping(Bytes::from_static(b"p")), false).is_none());
        assert!(device_payload(Message::Pong(Bytes::new()), true).is_none());
        assert!(device_payload(Message::Close(None), true).is_none());
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(FrameKind::of(&Message::text("a")), FrameKind::Text);
        assert_eq!(FrameKind::of(&Message::binary(vec![1])), FrameKind::Binary);
        assert_eq!(FrameKind::of(&Message::Close(None)), FrameKind::Other);
        assert_eq!(FrameKind::of(&Message::Pong(Bytes::new())), FrameKind::Other);
    }

    #[test]
    fn test_empty_text_with_newline() {
        let payload = device_payload(Message::text(""), true).unwrap();
        assert_eq!(payload.as_ref(), b"\r\n");
    }

    proptest! {
        #[test]
        fn prop_payload_unchanged_except_suffix(data in prop::collection::vec(any::<u8>(), 0..512), append in any::<bool>()) {
            let payload = device_payload(Message::binary(data.clone()), append).unwrap();
            if append {
                prop_assert_eq!(&payload[..data.len()], &data[..]);
                prop_assert_eq!(&payload[data.len()..], LINE_ENDING);
            } else {
                prop_assert_eq!(payload.as_ref(), &data[..]);
            }
        }

        #[test]
        fn prop_text_and_binary_forwarded_identically(text in ".{0,64}", append in any::<bool>()) {
            let from_text = device_payload(Message::text(text.clone()), append).unwrap();
            let from_binary = device_payload(Message::binary(text.into_bytes()), append).unwrap();
            prop_assert_eq!(from_text, from_binary);
        }
    }
}
