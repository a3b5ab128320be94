// Shared between the integration test binaries; each one uses a subset.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use inspector_socket::error::Error;
use inspector_socket::socket::ReadFn;
use inspector_socket::{HandshakeEvent, InspectorSocket, ReadEvent, Transport};

pub const HANDSHAKE_REQ: &[u8] = b"GET /ws/path HTTP/1.1\r\n\
    Host: localhost:9222\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: aaa==\r\n\
    Sec-WebSocket-Version: 13\r\n\r\n";

pub const HANDSHAKE_RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Accept: Dt87H1OULVZnSJo/KgMUYI7xPCg=\r\n\r\n";

pub const BAD_REQUEST_RESPONSE: &[u8] = b"HTTP/1.0 400 Bad Request\r\n\
    Content-Type: text/html; charset=UTF-8\r\n\r\n\
    WebSockets request was expected\r\n";

/// "1234" masked with 7f c2 66 31.
pub const MASKED_1234: &[u8] = b"\x81\x84\x7f\xc2\x66\x31\x4e\xf0\x55\x05";

/// Empty close frame masked with 2d 0e 1e fa.
pub const MASKED_CLOSE: &[u8] = b"\x88\x80\x2d\x0e\x1e\xfa";

/// The unmasked close frame the server sends.
pub const SERVER_CLOSE: &[u8] = b"\x88\x00";

#[derive(Debug, Default)]
pub struct MockIo {
    pub written: Vec<u8>,
    pub reading: bool,
    pub closed: bool,
    pub fail_writes: bool,
}

/// Loop-thread stand-in for a tcp stream: records writes, tracks the
/// read subscription, and panics on a second close.
#[derive(Debug, Clone, Default)]
pub struct MockTransport(pub Rc<RefCell<MockIo>>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().written)
    }

    pub fn reading(&self) -> bool {
        self.0.borrow().reading
    }

    pub fn closed(&self) -> bool {
        self.0.borrow().closed
    }

    pub fn fail_writes(&self) {
        self.0.borrow_mut().fail_writes = true;
    }
}

impl Transport for MockTransport {
    fn read_start(&mut self) -> io::Result<()> {
        self.0.borrow_mut().reading = true;
        Ok(())
    }

    fn read_stop(&mut self) {
        self.0.borrow_mut().reading = false;
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut io = self.0.borrow_mut();
        if io.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        io.written.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        let mut io = self.0.borrow_mut();
        assert!(!io.closed, "transport closed twice");
        io.closed = true;
    }

    fn is_closing(&self) -> bool {
        self.0.borrow().closed
    }
}

/// Handshake callback events, owned for later assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    HttpGet(String),
    Upgrading(String),
    Upgraded(String),
    Failed,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn record(events: &EventLog, event: HandshakeEvent<'_>) {
    let event = match event {
        HandshakeEvent::HttpGet { path } => Event::HttpGet(path.to_owned()),
        HandshakeEvent::Upgrading { path } => Event::Upgrading(path.to_owned()),
        HandshakeEvent::Upgraded { path } => Event::Upgraded(path.to_owned()),
        HandshakeEvent::Failed => Event::Failed,
    };
    events.borrow_mut().push(event);
}

/// Accept with a callback that records every event and accepts everything.
pub fn accept_recording(transport: MockTransport) -> (InspectorSocket<MockTransport>, EventLog) {
    let events: EventLog = Rc::default();
    let log = events.clone();
    let socket = InspectorSocket::accept(transport, move |_io, event| {
        record(&log, event);
        true
    })
    .unwrap();
    (socket, events)
}

/// Read-side events, flattened for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    Message(Vec<u8>),
    Closed,
    Protocol,
    Io,
}

pub type ReadLog = Rc<RefCell<Vec<Read>>>;

pub fn read_recorder(log: &ReadLog) -> ReadFn {
    let log = log.clone();
    Box::new(move |event| {
        let event = match event {
            ReadEvent::Message(payload) => Read::Message(payload),
            ReadEvent::Closed => Read::Closed,
            ReadEvent::Error(Error::Io(_)) => Read::Io,
            ReadEvent::Error(_) => Read::Protocol,
        };
        log.borrow_mut().push(event);
    })
}

/// Run the handshake to completion on a fresh connection and drain the
/// 101 response from the mock.
pub fn upgraded_socket() -> (InspectorSocket<MockTransport>, MockTransport, EventLog) {
    init_logger();
    let transport = MockTransport::new();
    let (mut socket, events) = accept_recording(transport.clone());
    socket.data_received(HANDSHAKE_REQ);
    assert_eq!(transport.take_written(), HANDSHAKE_RESPONSE);
    (socket, transport, events)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
