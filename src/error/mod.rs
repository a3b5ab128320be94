//! Error taxonomy: frame violations, handshake failures, transport
//! faults. The connection maps each of these to at most one terminal
//! user-visible callback.

mod frame;
mod handshake;

pub use frame::FrameError;
pub use handshake::HandshakeError;

use std::fmt::{self, Display, Formatter};
use std::io;

/// Any failure a connection can surface to its host.
#[derive(Debug)]
pub enum Error {
    /// The peer broke the framing rules after the upgrade.
    Frame(FrameError),

    /// The http exchange never produced a websocket.
    Handshake(HandshakeError),

    /// The underlying byte stream failed or hit end of stream.
    Io(io::Error),
}

macro_rules! from_variant {
    ($( $ty:ty => $variant:ident; )+) => {
        $(
            impl From<$ty> for Error {
                fn from(e: $ty) -> Self { Error::$variant(e) }
            }
        )+
    };
}

from_variant! {
    FrameError => Frame;
    HandshakeError => Handshake;
    io::Error => Io;
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Frame(e) => write!(f, "websocket frame: {}", e),
            Error::Handshake(e) => write!(f, "upgrade handshake: {}", e),
            Error::Io(e) => write!(f, "transport: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frame(e) => Some(e),
            Error::Handshake(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}
