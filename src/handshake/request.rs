//! Client upgrade request.
//!
//! The request is parsed from the front of the connection's read
//! buffer. Because the buffer accumulates whatever the transport
//! delivers, the request may arrive split at any byte boundary; the
//! caller simply feeds the whole buffer again once more data lands,
//! and [`ParseStatus::Partial`] tells it to wait.

use super::{MAX_ALLOW_HEADERS, SEC_WEBSOCKET_KEY};
use crate::error::HandshakeError;

/// Everything the connection needs to know about one parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub is_get: bool,
    pub is_upgrade: bool,
    pub path: String,
    pub ws_key: Option<String>,
}

/// Result of a parse attempt over the buffered bytes.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// The buffer does not yet hold a complete request.
    Partial,

    /// A complete request; `consumed` bytes cover it, the rest of the
    /// buffer belongs to whatever follows.
    Complete {
        consumed: usize,
        request: HttpRequest,
    },
}

/// Parse one http request from the front of `buf`.
///
/// The upgrade flag follows the joint rule of the usual http parsers:
/// an `Upgrade` header must be present and a `Connection` header must
/// carry the `upgrade` token, both matched case-insensitively. The
/// `Sec-WebSocket-Key` header name, in contrast, is matched
/// case-sensitively.
pub fn parse_request(buf: &[u8]) -> Result<ParseStatus, HandshakeError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_ALLOW_HEADERS];
    let mut request = httparse::Request::new(&mut headers);

    let consumed = match request.parse(buf)? {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(ParseStatus::Partial),
    };

    let is_get = request.method == Some("GET");
    let path = request.path.unwrap_or("").to_owned();

    let mut has_upgrade = false;
    let mut connection_upgrade = false;
    let mut ws_key = None;

    for hdr in request.headers.iter() {
        if hdr.name.eq_ignore_ascii_case("upgrade") {
            has_upgrade = true;
        } else if hdr.name.eq_ignore_ascii_case("connection") {
            connection_upgrade |= hdr
                .value
                .split(|b| *b == b',')
                .any(|token| trim_ascii(token).eq_ignore_ascii_case(b"upgrade"));
        }

        if hdr.name == SEC_WEBSOCKET_KEY {
            ws_key = Some(String::from_utf8_lossy(hdr.value).into_owned());
        }
    }

    Ok(ParseStatus::Complete {
        consumed,
        request: HttpRequest {
            is_get,
            is_upgrade: has_upgrade && connection_upgrade,
            path,
            ws_key,
        },
    })
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}
