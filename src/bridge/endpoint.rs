//! Remote endpoint URI for a device
//!
//! `ws://<server_addr>/ws/device?id=<device_id>`, with the id percent-encoded.

use crate::constants::{DEVICE_ID_PARAM, ENDPOINT_PATH, ENDPOINT_SCHEME};
use std::fmt::Write;

/// Build the WebSocket URI identifying `device_id` on `server_addr`
pub fn device_url(server_addr: &str, device_id: &str) -> String {
    format!(
        "{}://{}{}?{}={}",
        ENDPOINT_SCHEME,
        server_addr,
        ENDPOINT_PATH,
        DEVICE_ID_PARAM,
        encode_query_value(device_id)
    )
}

/// Percent-encode everything except RFC 3986 unreserved characters
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_url() {
        assert_eq!(
            device_url("localhost:80", "rpi-01"),
            "ws://localhost:80/ws/device?id=rpi-01"
        );
    }

    #[test]
    fn test_device_id_is_encoded() {
        assert_eq!(
            device_url("10.0.0.5:8080", "lab bench/#2"),
            "ws://10.0.0.5:8080/ws/device?id=lab%20bench%2F%232"
        );
    }

    #[test]
    fn test_non_ascii_id() {
        assert_eq!(encode_query_value("é"), "%C3%A9");
        assert_eq!(encode_query_value("a&b=c"), "a%26b%3Dc");
    }
}
