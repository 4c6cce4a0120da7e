use std::future::Future;

use anyhow::Result;

/// WebSocket normal-closure code. A close carrying this code is an
/// intentional teardown and never triggers reconnection.
pub const NORMAL_CLOSE: u16 = 1000;

/// Abnormal-closure code used when the peer vanishes without a close frame.
pub const ABNORMAL_CLOSE: u16 = 1006;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Free text from the remote, surfaced verbatim.
    Message(String),
    Closed { code: u16, reason: String },
}

/// Connect capability. The channel owns one of these and dials through it
/// for the initial attempt and every reconnect.
pub trait ControlTransport: Send + 'static {
    type Conn: TransportConn;

    fn connect(&mut self, url: &str) -> impl Future<Output = Result<Self::Conn>> + Send;
}

/// A single live connection.
pub trait TransportConn: Send + 'static {
    fn send(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Next inbound event. After a `Closed` event the connection is spent.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    fn close(&mut self, code: u16) -> impl Future<Output = ()> + Send;
}
