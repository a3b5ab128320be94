//! Websocket upgrade handshake.
//!
//! Server side of [RFC-6455 Section 4](https://datatracker.ietf.org/doc/html/rfc6455#section-4):
//! a client opens with an http/1.1 `GET` carrying the upgrade headers,
//! the server answers `101 Switching Protocols` with the derived
//! `Sec-WebSocket-Accept` key, and the byte stream switches to frames.

pub mod key;
pub mod request;

pub use key::derive_accept_key;
pub use request::{parse_request, HttpRequest, ParseStatus};

/// 32
pub const MAX_ALLOW_HEADERS: usize = 32;

/// 258EAFA5-E914-47DA-95CA-C5AB0DC85B11
pub const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The key header name is matched byte for byte;
/// `sec-websocket-key` is not recognized.
pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";

/// Everything of the 101 response up to the accept key.
const UPGRADE_RESPONSE_HEAD: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Accept: ";

/// The full response sent on any handshake failure.
pub const BAD_REQUEST_RESPONSE: &[u8] = b"HTTP/1.0 400 Bad Request\r\n\
    Content-Type: text/html; charset=UTF-8\r\n\r\n\
    WebSockets request was expected\r\n";

/// Render the complete 101 response for a derived accept key.
pub fn upgrade_response(sec_accept: &[u8; 28]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(UPGRADE_RESPONSE_HEAD.len() + sec_accept.len() + 4);
    buf.extend_from_slice(UPGRADE_RESPONSE_HEAD);
    buf.extend_from_slice(sec_accept);
    buf.extend_from_slice(b"\r\n\r\n");
    buf
}
