use std::future::Future;
use std::io;

use tokio::net::UdpSocket;
use tracing::info;

use crate::ScanError;

/// The connectionless receive primitive the scanner listens on. Injected so
/// the listen loop is identical against real UDP and the in-memory stub.
pub trait BeaconSocket: Send + 'static {
    /// Next datagram as text. An error ends the scan.
    fn recv(&mut self) -> impl Future<Output = io::Result<String>> + Send;
}

/// Real UDP socket bound to the beacon port.
pub struct UdpBeaconSocket {
    socket: UdpSocket,
    buf: [u8; 512],
}

impl UdpBeaconSocket {
    pub async fn bind(port: u16) -> Result<Self, ScanError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(|source| ScanError::Bind { port, source })?;
        info!("scan: listening for beacons on udp/{}", port);
        Ok(Self { socket, buf: [0u8; 512] })
    }
}

impl BeaconSocket for UdpBeaconSocket {
    fn recv(&mut self) -> impl Future<Output = io::Result<String>> + Send {
        async move {
            let (n, _peer) = self.socket.recv_from(&mut self.buf).await?;
            Ok(String::from_utf8_lossy(&self.buf[..n]).into_owned())
        }
    }
}

/// In-memory socket for tests: datagrams are whatever the feed pushes.
pub struct StubBeaconSocket {
    rx: tokio::sync::mpsc::UnboundedReceiver<String>,
}

#[derive(Clone)]
pub struct StubBeaconFeed {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl StubBeaconSocket {
    pub fn new() -> (Self, StubBeaconFeed) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { rx }, StubBeaconFeed { tx })
    }
}

impl StubBeaconFeed {
    pub fn push(&self, msg: &str) {
        let _ = self.tx.send(msg.to_string());
    }
}

impl BeaconSocket for StubBeaconSocket {
    fn recv(&mut self) -> impl Future<Output = io::Result<String>> + Send {
        async move {
            self.rx
                .recv()
                .await
                .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "beacon feed closed"))
        }
    }
}
