//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! Frames are hybi-17 text or close frames; everything this endpoint
//! does not exchange (continuation, binary, ping, pong, extensions)
//! is rejected during decode. Payload lengths ride big-endian on the
//! wire: one byte up to 125, `126` plus a u16, or `127` plus a u64.

pub mod flag;
pub mod mask;

pub use flag::{Fin, OpCode};
pub use mask::{apply_mask, Mask};

use crate::error::FrameError;

/// Largest possible frame head: flags + 64-bit length + mask key.
pub const MAX_HEAD_LEN: usize = 2 + 8 + 4;

/// An empty, unmasked close frame.
pub const CLOSE_FRAME: [u8; 2] = [0x88, 0x00];

/// Outcome of decoding one frame from the front of a buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A complete text frame; `consumed` counts the whole frame.
    Ok { payload: Vec<u8>, consumed: usize },

    /// The buffer holds less than one whole frame.
    Incomplete,

    /// A complete close frame.
    Close { consumed: usize },
}

/// Encode a single text frame with the FIN bit set.
///
/// The mask key is four caller supplied bytes; the server write path
/// uses [`Mask::None`].
pub fn encode(payload: &[u8], mask: Mask) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MAX_HEAD_LEN + payload.len());

    frame.push(Fin::Y as u8 | OpCode::Text as u8);

    match payload.len() {
        len @ 0..=125 => frame.push(mask.to_flag() | len as u8),
        len @ 126..=0xffff => {
            frame.push(mask.to_flag() | 126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            frame.push(mask.to_flag() | 127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }

    match mask {
        Mask::Key(key) => {
            frame.extend_from_slice(&key);
            let beg = frame.len();
            frame.extend_from_slice(payload);
            apply_mask(key, &mut frame[beg..]);
        }
        Mask::Skip => {
            frame.extend_from_slice(&[0u8; 4]);
            frame.extend_from_slice(payload);
        }
        Mask::None => frame.extend_from_slice(payload),
    }

    frame
}

/// Decode one frame from the front of `buf`.
///
/// `from_client` enforces the RFC-6455 rule that frames travelling
/// client to server must be masked. The payload of a text frame is
/// returned unmasked as an owned buffer.
pub fn decode(buf: &[u8], from_client: bool) -> Result<Decoded, FrameError> {
    if buf.len() < 2 {
        return Ok(Decoded::Incomplete);
    }

    let b1 = buf[0];
    let b2 = buf[1];

    if Fin::from_flag(b1) == Fin::N {
        return Err(FrameError::Fragmented);
    }

    // reserved1 carries permessage-deflate, which is never negotiated
    if b1 & 0x40 != 0 {
        return Err(FrameError::Compressed);
    }

    if b1 & 0x30 != 0 {
        return Err(FrameError::ReservedBits);
    }

    let opcode = OpCode::from_flag(b1)?;

    let masked = b2 & 0x80 != 0;
    if from_client && !masked {
        return Err(FrameError::UnmaskedClientFrame);
    }

    let mut n: usize = 2;

    let mut length = u64::from(b2 & 0x7f);
    if length == 126 {
        if buf.len() - n < 2 {
            return Ok(Decoded::Incomplete);
        }
        length = u64::from(u16::from_be_bytes([buf[2], buf[3]]));
        n += 2;
    } else if length == 127 {
        if buf.len() - n < 8 {
            return Ok(Decoded::Incomplete);
        }
        let mut b = [0u8; 8];
        b.copy_from_slice(&buf[2..10]);
        length = u64::from_be_bytes(b);
        n += 8;
    }

    if length > i64::MAX as u64 {
        return Err(FrameError::PayloadTooLong);
    }
    let payload_len = match usize::try_from(length) {
        Ok(v) => v,
        Err(_) => return Err(FrameError::PayloadTooLong),
    };

    let key_len: usize = if masked { 4 } else { 0 };
    let total = match key_len.checked_add(payload_len) {
        Some(v) => v,
        None => return Err(FrameError::PayloadTooLong),
    };
    if buf.len() - n < total {
        return Ok(Decoded::Incomplete);
    }

    if opcode == OpCode::Close {
        return Ok(Decoded::Close { consumed: n + total });
    }

    let mut payload = buf[n + key_len..n + total].to_vec();
    if masked {
        let key = [buf[n], buf[n + 1], buf[n + 2], buf[n + 3]];
        if let Mask::Key(key) = Mask::from_key(key) {
            apply_mask(key, &mut payload);
        }
    }

    Ok(Decoded::Ok {
        payload,
        consumed: n + total,
    })
}
