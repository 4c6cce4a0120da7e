//! Persistent control channel to the vehicle.
//!
//! One bidirectional plaintext connection per vehicle, with automatic
//! bounded reconnection and a manual reconnect escape hatch. The channel is
//! generic over the transport primitive, so the reconnect state machine is
//! exercised unchanged against the real WebSocket link and the in-memory
//! stub used in tests and simulation mode.

pub mod calibration;
pub mod channel;
pub mod stub;
pub mod transport;
pub mod ws;

pub use calibration::send_calibration;
pub use channel::{ControlLink, LinkConfig, LinkError, LinkHandle, LinkState};
pub use transport::{ControlTransport, TransportConn, TransportEvent, NORMAL_CLOSE};

/// Control channel URL for a discovered vehicle address.
pub fn control_url(ip: &str, port: u16) -> String {
    format!("ws://{}:{}/", ip, port)
}

/// Default control channel port on the vehicle.
pub const DEFAULT_CONTROL_PORT: u16 = 81;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_url_shape() {
        assert_eq!(control_url("10.0.0.5", DEFAULT_CONTROL_PORT), "ws://10.0.0.5:81/");
    }
}
