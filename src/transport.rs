//! Transport abstraction.

use std::io;

/// Host-provided byte stream carrying one accepted connection.
///
/// The host owns the event loop; the connection tells the transport
/// when it wants data flowing and hands it bytes to send. Incoming
/// bytes and stream errors are pushed back into the connection through
/// [`InspectorSocket::data_received`] and
/// [`InspectorSocket::read_error`].
///
/// All calls happen on the loop thread; none of them may block.
///
/// [`InspectorSocket::data_received`]: crate::socket::InspectorSocket::data_received
/// [`InspectorSocket::read_error`]: crate::socket::InspectorSocket::read_error
pub trait Transport {
    /// Start delivering incoming bytes.
    fn read_start(&mut self) -> io::Result<()>;

    /// Pause delivery of incoming bytes.
    fn read_stop(&mut self);

    /// Queue outgoing bytes. Submission order is wire order.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Tear down the stream. Called at most once per connection.
    fn close(&mut self);

    /// Whether the stream is closed or closing.
    fn is_closing(&self) -> bool;
}
