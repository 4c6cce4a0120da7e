use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::{ControlTransport, TransportConn, TransportEvent, ABNORMAL_CLOSE};

/// In-memory transport. Connecting succeeds instantly (unless scripted to
/// fail), sent frames are recorded, and the paired [`StubRemote`] plays the
/// vehicle side. Doubles as the simulation-mode transport: the channel's
/// state machine cannot tell it apart from a real link.
pub struct StubTransport {
    shared: Arc<StubShared>,
}

/// Test-side controls and observations for a [`StubTransport`].
#[derive(Clone)]
pub struct StubRemote {
    shared: Arc<StubShared>,
}

struct StubShared {
    sent: Mutex<Vec<String>>,
    connects: AtomicUsize,
    fail_next_connects: AtomicUsize,
    connect_times: Mutex<Vec<tokio::time::Instant>>,
    // sender into the currently live connection, replaced on each connect
    live: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    closed_with: Mutex<Option<u16>>,
}

impl StubTransport {
    pub fn new() -> (Self, StubRemote) {
        let shared = Arc::new(StubShared {
            sent: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            fail_next_connects: AtomicUsize::new(0),
            connect_times: Mutex::new(Vec::new()),
            live: Mutex::new(None),
            closed_with: Mutex::new(None),
        });
        (Self { shared: shared.clone() }, StubRemote { shared })
    }
}

impl StubRemote {
    /// Script the next `n` connect attempts to fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.shared.fail_next_connects.store(n, Ordering::SeqCst);
    }

    /// Inject a message from the vehicle into the live connection.
    pub fn push_message(&self, text: &str) {
        if let Some(tx) = self.shared.live.lock().unwrap().as_ref() {
            let _ = tx.send(TransportEvent::Message(text.to_string()));
        }
    }

    /// Close the live connection with the given code.
    pub fn close(&self, code: u16, reason: &str) {
        if let Some(tx) = self.shared.live.lock().unwrap().take() {
            let _ = tx.send(TransportEvent::Closed { code, reason: reason.to_string() });
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub fn clear_sent(&self) {
        self.shared.sent.lock().unwrap().clear();
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Instants of every connect attempt, in order. With paused tokio time
    /// the gaps are exactly the backoff delays.
    pub fn connect_times(&self) -> Vec<tokio::time::Instant> {
        self.shared.connect_times.lock().unwrap().clone()
    }

    /// Code the channel closed the connection with, if it did.
    pub fn closed_with(&self) -> Option<u16> {
        *self.shared.closed_with.lock().unwrap()
    }
}

pub struct StubConn {
    shared: Arc<StubShared>,
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl ControlTransport for StubTransport {
    type Conn = StubConn;

    fn connect(&mut self, url: &str) -> impl Future<Output = Result<Self::Conn>> + Send {
        let shared = self.shared.clone();
        let url = url.to_string();
        async move {
            shared.connects.fetch_add(1, Ordering::SeqCst);
            shared.connect_times.lock().unwrap().push(tokio::time::Instant::now());
            let fails = &shared.fail_next_connects;
            if fails
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(anyhow!("stub: scripted connect failure to {}", url));
            }
            debug!("stub: connected to {}", url);
            let (tx, rx) = mpsc::unbounded_channel();
            *shared.live.lock().unwrap() = Some(tx);
            Ok(StubConn { shared, rx })
        }
    }
}

impl TransportConn for StubConn {
    fn send(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send {
        let text = text.to_string();
        async move {
            debug!("stub: sent {:?}", text);
            self.shared.sent.lock().unwrap().push(text);
            Ok(())
        }
    }

    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send {
        async move {
            match self.rx.recv().await {
                Some(ev) => ev,
                // remote side gone without a close frame
                None => TransportEvent::Closed {
                    code: ABNORMAL_CLOSE,
                    reason: "stub remote dropped".to_string(),
                },
            }
        }
    }

    fn close(&mut self, code: u16) -> impl Future<Output = ()> + Send {
        *self.shared.closed_with.lock().unwrap() = Some(code);
        self.shared.live.lock().unwrap().take();
        async {}
    }
}
