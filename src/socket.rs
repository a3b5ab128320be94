//! Inspector connection state machine.
//!
//! One [`InspectorSocket`] owns one accepted byte stream and walks it
//! through the connection phases: plain http, the websocket upgrade,
//! framed traffic, and the close handshake. The host pushes incoming
//! bytes in through [`data_received`](InspectorSocket::data_received)
//! and [`read_error`](InspectorSocket::read_error); the socket talks
//! back through the [`Transport`] it owns and the callbacks installed
//! by [`accept`](InspectorSocket::accept),
//! [`read_start`](InspectorSocket::read_start) and
//! [`close`](InspectorSocket::close).

use std::io;
use std::mem;

use log::{debug, trace, warn};

use crate::buffer::ReadBuf;
use crate::error::{Error, HandshakeError};
use crate::frame::{self, Decoded, Mask};
use crate::handshake::{self, derive_accept_key, parse_request, HttpRequest, ParseStatus};
use crate::transport::Transport;

/// Handshake progress callback.
///
/// Fired for every http request on the stream. The transport reference
/// lets the callback answer a plain `GET` with raw bytes before the
/// upgrade completes. The return value is only read for
/// [`HandshakeEvent::HttpGet`] (keep listening on this connection?) and
/// [`HandshakeEvent::Upgrading`] (accept the upgrade?).
pub type HandshakeFn<T> = Box<dyn FnMut(&mut T, HandshakeEvent<'_>) -> bool>;

/// Message delivery callback, installed by [`InspectorSocket::read_start`].
pub type ReadFn = Box<dyn FnMut(ReadEvent)>;

/// Close completion callback, installed by [`InspectorSocket::close`].
pub type CloseFn = Box<dyn FnOnce()>;

/// One step of the handshake, delivered to the handshake callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent<'a> {
    /// A request without the upgrade headers. Return `true` to keep
    /// the connection open for further requests.
    HttpGet { path: &'a str },

    /// An upgrade request about to be accepted. Return `false` to veto.
    Upgrading { path: &'a str },

    /// The 101 response went out; framed traffic may start.
    Upgraded { path: &'a str },

    /// Terminal. The connection is gone.
    Failed,
}

/// What a websocket read produced.
#[derive(Debug)]
pub enum ReadEvent {
    /// One decoded text message.
    Message(Vec<u8>),

    /// The peer sent a close frame.
    Closed,

    /// Protocol violation or transport failure; the connection is
    /// closed (protocol) or dead (transport) afterwards.
    Error(Error),
}

/// Coarse connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Http,
    Ws,
    Closing,
    Closed,
}

struct HttpState<T> {
    handshake: HandshakeFn<T>,
}

#[derive(Default)]
struct WsState {
    read: Option<ReadFn>,
    close_cb: Option<CloseFn>,
    close_sent: bool,
    received_close: bool,
}

enum State<T> {
    Http(HttpState<T>),
    Ws(WsState),
    Closed,
}

/// Server end of one inspector connection.
pub struct InspectorSocket<T: Transport> {
    transport: T,
    buf: ReadBuf,
    state: State<T>,
    shutting_down: bool,
    connection_eof: bool,
}

impl<T: Transport> InspectorSocket<T> {
    /// Adopt a freshly accepted transport and start the handshake.
    ///
    /// On a transport error the stream is closed and the error handed
    /// back; no callback fires.
    pub fn accept<F>(mut transport: T, handshake: F) -> io::Result<Self>
    where
        F: FnMut(&mut T, HandshakeEvent<'_>) -> bool + 'static,
    {
        if let Err(e) = transport.read_start() {
            transport.close();
            return Err(e);
        }
        Ok(Self {
            transport,
            buf: ReadBuf::new(),
            state: State::Http(HttpState {
                handshake: Box::new(handshake),
            }),
            shutting_down: false,
            connection_eof: false,
        })
    }

    /// Feed bytes the transport read off the wire.
    pub fn data_received(&mut self, chunk: &[u8]) {
        trace!("read {} bytes", chunk.len());
        match self.phase() {
            Phase::Http => self.http_data(chunk),
            Phase::Ws | Phase::Closing => self.ws_data(chunk),
            Phase::Closed => {}
        }
    }

    /// Report a transport read failure or end of stream.
    ///
    /// During the handshake this fails it; afterwards the error is
    /// delivered to the read callback once, unless the user already
    /// asked to close.
    pub fn read_error(&mut self, err: io::Error) {
        match mem::replace(&mut self.state, State::Closed) {
            State::Http(mut http) => {
                debug!("read error during handshake: {}", err);
                (http.handshake)(&mut self.transport, HandshakeEvent::Failed);
                self.close_connection();
            }
            State::Ws(mut ws) => {
                debug!("read error on websocket connection: {}", err);
                let first = !self.connection_eof;
                self.connection_eof = true;
                if first && !self.shutting_down {
                    if let Some(read) = ws.read.as_mut() {
                        read(ReadEvent::Error(Error::Io(err)));
                    }
                }
                self.state = State::Ws(ws);
            }
            State::Closed => {}
        }
    }

    /// Send a message to the peer.
    ///
    /// Once the upgrade has completed the bytes travel as one text
    /// frame; before that they go out verbatim, which lets the
    /// handshake callback answer plain http requests.
    pub fn write(&mut self, data: &[u8]) {
        match self.phase() {
            Phase::Http => {
                trace!("write {} raw bytes", data.len());
                let _ = self.transport.write(data);
            }
            Phase::Ws | Phase::Closing => {
                trace!("write {} byte text frame", data.len());
                let encoded = frame::encode(data, Mask::None);
                let _ = self.transport.write(&encoded);
            }
            Phase::Closed => warn!("write on closed connection dropped"),
        }
    }

    /// Install the message callback and resume transport reads.
    ///
    /// Legal once the connection has upgraded. `None` keeps the frame
    /// machinery running with message delivery disabled, which is how
    /// the close handshake drains the peer's reply.
    pub fn read_start(&mut self, read: Option<ReadFn>) {
        assert!(
            matches!(self.state, State::Ws(_)),
            "read_start before upgrade"
        );
        assert!(!self.shutting_down || read.is_none());

        if let State::Ws(ws) = &mut self.state {
            ws.close_sent = false;
            ws.read = read;
        }
        if self.transport.read_start().is_err() {
            self.close_connection();
        }
    }

    /// Pause transport reads and drop the message callback.
    pub fn read_stop(&mut self) {
        self.transport.read_stop();
        if let State::Ws(ws) = &mut self.state {
            ws.read = None;
        }
    }

    /// Start the close handshake; `cb` fires once the transport is
    /// closed. Must not be called twice, nor before the upgrade.
    pub fn close<F>(&mut self, cb: F)
    where
        F: FnOnce() + 'static,
    {
        assert!(!self.shutting_down, "connection already shutting down");
        assert!(!self.transport.is_closing(), "transport already closing");
        assert!(matches!(self.state, State::Ws(_)), "close before upgrade");

        self.shutting_down = true;
        if let State::Ws(ws) = &mut self.state {
            ws.close_cb = Some(Box::new(cb));
            ws.read = None;
        }

        if self.connection_eof {
            self.close_connection();
        } else {
            self.transport.read_stop();
            self.send_close_frame();
            // keep reading so the peer's reply drains through the state machine
            if self.transport.read_start().is_err() {
                self.close_connection();
            }
        }
    }

    /// Whether the connection can still carry messages.
    pub fn is_active(&self) -> bool {
        !self.shutting_down && !self.transport.is_closing()
    }

    /// Current [`Phase`].
    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Http(_) => Phase::Http,
            State::Ws(ws) => {
                if self.shutting_down || ws.close_sent || ws.received_close {
                    Phase::Closing
                } else {
                    Phase::Ws
                }
            }
            State::Closed => Phase::Closed,
        }
    }

    fn http_data(&mut self, chunk: &[u8]) {
        self.buf.extend(chunk);
        while !self.buf.is_empty() {
            match parse_request(self.buf.data()) {
                Ok(ParseStatus::Partial) => return,
                Ok(ParseStatus::Complete { consumed, request }) => {
                    self.buf.consume(consumed);
                    let http = match mem::replace(&mut self.state, State::Closed) {
                        State::Http(http) => http,
                        other => {
                            self.state = other;
                            return;
                        }
                    };
                    self.request_complete(http, request);
                    if !matches!(self.state, State::Http(_)) {
                        return;
                    }
                }
                Err(e) => {
                    self.handshake_failed(e);
                    return;
                }
            }
        }
    }

    fn request_complete(&mut self, mut http: HttpState<T>, req: HttpRequest) {
        if !req.is_get {
            self.fail_handshake(http, HandshakeError::HttpMethod);
        } else if !req.is_upgrade {
            debug!("http request for {:?}", req.path);
            let event = HandshakeEvent::HttpGet { path: &req.path };
            if (http.handshake)(&mut self.transport, event) {
                self.state = State::Http(http);
            } else {
                self.fail_handshake(http, HandshakeError::Rejected);
            }
        } else if let Some(key) = &req.ws_key {
            let event = HandshakeEvent::Upgrading { path: &req.path };
            if (http.handshake)(&mut self.transport, event) {
                let accept = derive_accept_key(key.as_bytes());
                let response = handshake::upgrade_response(&accept);
                if self.transport.write(&response).is_ok() {
                    self.transport.read_stop();
                    // any bytes pipelined past the request terminator are dropped
                    self.buf.clear();
                    self.state = State::Ws(WsState::default());
                    debug!("connection upgraded, path {:?}", req.path);
                    let event = HandshakeEvent::Upgraded { path: &req.path };
                    (http.handshake)(&mut self.transport, event);
                } else {
                    (http.handshake)(&mut self.transport, HandshakeEvent::Failed);
                    self.close_connection();
                }
            } else {
                self.fail_handshake(http, HandshakeError::Rejected);
            }
        } else {
            self.fail_handshake(http, HandshakeError::SecWebSocketKey);
        }
    }

    fn handshake_failed(&mut self, reason: HandshakeError) {
        if let State::Http(http) = mem::replace(&mut self.state, State::Closed) {
            self.fail_handshake(http, reason);
        }
    }

    fn fail_handshake(&mut self, mut http: HttpState<T>, reason: HandshakeError) {
        warn!("handshake failed: {}", reason);
        let _ = self.transport.write(handshake::BAD_REQUEST_RESPONSE);
        self.state = State::Closed;
        self.close_connection();
        (http.handshake)(&mut self.transport, HandshakeEvent::Failed);
    }

    fn ws_data(&mut self, chunk: &[u8]) {
        self.buf.extend(chunk);
        loop {
            match frame::decode(self.buf.data(), true) {
                Ok(Decoded::Incomplete) => return,
                Ok(Decoded::Close { consumed }) => {
                    self.buf.consume(consumed);
                    self.close_frame_received();
                    return;
                }
                Ok(Decoded::Ok { payload, consumed }) => {
                    self.buf.consume(consumed);
                    trace!("frame decoded, {} byte payload", payload.len());
                    if let State::Ws(ws) = &mut self.state {
                        if let Some(read) = ws.read.as_mut() {
                            read(ReadEvent::Message(payload));
                        }
                    }
                    if self.buf.is_empty() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("protocol violation: {}", e);
                    if let State::Ws(ws) = &mut self.state {
                        if let Some(read) = ws.read.as_mut() {
                            read(ReadEvent::Error(Error::Frame(e)));
                        }
                    }
                    self.close_connection();
                    return;
                }
            }
        }
    }

    fn close_frame_received(&mut self) {
        debug!("close frame received");
        let already_sent = match &mut self.state {
            State::Ws(ws) => {
                ws.received_close = true;
                ws.close_sent
            }
            _ => return,
        };
        if already_sent {
            self.close_connection();
        } else {
            if let State::Ws(ws) = &mut self.state {
                if let Some(read) = ws.read.as_mut() {
                    read(ReadEvent::Closed);
                }
            }
            self.send_close_frame();
        }
    }

    fn send_close_frame(&mut self) {
        trace!("send close frame");
        let _ = self.transport.write(&frame::CLOSE_FRAME);
        let finished = match &mut self.state {
            State::Ws(ws) => {
                ws.close_sent = true;
                ws.received_close
            }
            _ => false,
        };
        if finished {
            self.close_connection();
        }
    }

    fn close_connection(&mut self) {
        if !self.transport.is_closing() {
            self.transport.read_stop();
            self.transport.close();
            self.dispose();
        } else if let State::Ws(ws) = &mut self.state {
            if let Some(cb) = ws.close_cb.take() {
                cb();
            }
        }
    }

    // Owned state is released before the close callback can observe
    // the Closed phase.
    fn dispose(&mut self) {
        self.buf = ReadBuf::new();
        let close_cb = match mem::replace(&mut self.state, State::Closed) {
            State::Ws(ws) => ws.close_cb,
            _ => None,
        };
        debug!("connection closed");
        if let Some(cb) = close_cb {
            cb();
        }
    }
}

impl<T: Transport> AsRef<T> for InspectorSocket<T> {
    #[inline]
    fn as_ref(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> AsMut<T> for InspectorSocket<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
