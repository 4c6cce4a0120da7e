//! Passive discovery of the vehicle on the local network.
//!
//! The vehicle announces itself with a periodic UDP broadcast beacon of the
//! form `ESP32|<ip>|<mac>`. The scanner binds a fixed port, reports the first
//! matching beacon and keeps listening so a fresh announcement can supersede
//! a stale address. It never times out on its own; stopping is the caller's
//! decision.

pub mod beacon;
pub mod socket;

use beacon::{parse_beacon, Beacon};
use socket::BeaconSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default beacon port used by the vehicle firmware.
pub const DEFAULT_PORT: u16 = 4210;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub port: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Binding the beacon port failed. Fatal for the discovery subsystem;
    /// restarting discovery is the caller's decision, never retried here.
    #[error("failed to bind beacon port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to a running scan task. Dropping it stops the listener.
pub struct Scanner {
    task: JoinHandle<()>,
    detected: watch::Receiver<Option<Beacon>>,
}

impl Scanner {
    /// Spawns the listen task over an already-bound socket.
    pub fn start<S: BeaconSocket>(socket: S) -> Self {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(listen(socket, tx));
        Self { task, detected: rx }
    }

    /// Watch of the most recent detection. `None` until the first beacon.
    pub fn detected(&self) -> watch::Receiver<Option<Beacon>> {
        self.detected.clone()
    }

    /// Waits for the first detection. Returns `None` if the listener dies
    /// first (receive failure on the socket).
    pub async fn wait_detected(&mut self) -> Option<Beacon> {
        loop {
            if let Some(b) = self.detected.borrow().clone() {
                return Some(b);
            }
            if self.detected.changed().await.is_err() {
                return None;
            }
        }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn listen<S: BeaconSocket>(mut socket: S, tx: watch::Sender<Option<Beacon>>) {
    let mut seen_first = false;
    loop {
        let msg = match socket.recv().await {
            Ok(m) => m,
            Err(e) => {
                warn!("scan: receive failed: {}", e);
                return;
            }
        };
        match parse_beacon(&msg) {
            Some(b) => {
                if !seen_first {
                    info!("scan: vehicle detected ip={} mac={}", b.ip, b.mac);
                    seen_first = true;
                } else {
                    debug!("scan: beacon ip={} mac={}", b.ip, b.mac);
                }
                let _ = tx.send(Some(b));
            }
            // malformed datagrams are discarded, not reported
            None => debug!("scan: ignoring datagram: {:?}", msg),
        }
    }
}
