//! Server-side websocket endpoint for attaching a remote inspector
//! client to a host process.
//!
//! The crate owns everything between an accepted byte stream and the
//! debugger session riding on it: a minimal http/1.1 request parser,
//! the RFC-6455 upgrade handshake, the hybi-17 text frame codec, and
//! the connection state machine that sequences handshake, framed
//! traffic and the close exchange. Listening sockets, TLS and the
//! protocol payload itself stay with the host.

pub mod buffer;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod socket;
pub mod transport;

pub use socket::{HandshakeEvent, InspectorSocket, Phase, ReadEvent};
pub use transport::Transport;
