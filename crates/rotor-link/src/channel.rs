use std::time::Duration;

use rotor_proto::command::encode_calibration;
use rotor_proto::CalibrationValues;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transport::{ControlTransport, TransportConn, TransportEvent, NORMAL_CLOSE};

/// Connection lifecycle state, owned exclusively by the channel actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Reconnect budget after a failure run. Exhausting it parks the
    /// channel in `Failed` until a manual reconnect.
    pub max_attempts: u32,
    /// Backoff delay is `attempts * backoff_step_ms`, capped.
    pub backoff_step_ms: u64,
    pub backoff_cap_ms: u64,
    /// Delay between reaching Connected and pushing held calibration;
    /// absorbs handshake completion races on the vehicle side.
    pub settle_delay_ms: u64,
    /// Free-text greeting sent once per successful open.
    pub greeting: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step_ms: 1000,
            backoff_cap_ms: 5000,
            settle_delay_ms: 500,
            greeting: "hello".to_string(),
        }
    }
}

impl LinkConfig {
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        Duration::from_millis((attempts as u64 * self.backoff_step_ms).min(self.backoff_cap_ms))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link is not connected")]
    NotConnected,
    #[error("link is closed")]
    Closed,
}

enum Cmd {
    Send(String),
    SetCalibration(Box<CalibrationValues>),
    Reconnect,
    Close,
}

/// Cloneable consumer handle onto a running channel actor.
#[derive(Clone)]
pub struct LinkHandle {
    tx: mpsc::UnboundedSender<Cmd>,
    state: watch::Receiver<LinkState>,
    message: watch::Receiver<Option<String>>,
}

impl LinkHandle {
    /// Transmits a raw token. Dropped with a local error when the channel
    /// is not connected; the payload is never queued for later.
    pub fn send(&self, payload: impl Into<String>) -> Result<(), LinkError> {
        let payload = payload.into();
        if *self.state.borrow() != LinkState::Connected {
            warn!("link: not connected, dropping {:?}", payload);
            return Err(LinkError::NotConnected);
        }
        self.tx.send(Cmd::Send(payload)).map_err(|_| LinkError::Closed)
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Last free-text message received from the vehicle.
    pub fn last_message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    pub fn message_watch(&self) -> watch::Receiver<Option<String>> {
        self.message.clone()
    }

    /// Hold calibration in the actor; it is (re)sent after every successful
    /// open, following the settle delay.
    pub fn set_calibration(&self, calib: CalibrationValues) {
        let _ = self.tx.send(Cmd::SetCalibration(Box::new(calib)));
    }

    /// Manual reconnect: resets the attempt counter and dials immediately,
    /// bypassing any backoff in progress.
    pub fn reconnect(&self) {
        let _ = self.tx.send(Cmd::Reconnect);
    }

    /// Intentional teardown. Cancels pending reconnects and closes the
    /// transport with the normal-closure code.
    pub fn close(&self) {
        let _ = self.tx.send(Cmd::Close);
    }
}

/// A running control channel. Dropping aborts the actor.
pub struct ControlLink {
    handle: LinkHandle,
    task: JoinHandle<()>,
}

impl ControlLink {
    /// Spawns the channel actor dialing `url` through `transport`.
    pub fn spawn<T: ControlTransport>(transport: T, config: LinkConfig, url: String) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let (msg_tx, msg_rx) = watch::channel(None);
        let actor = LinkActor {
            transport,
            config,
            url,
            state: state_tx,
            message: msg_tx,
            rx: cmd_rx,
            calibration: None,
        };
        let task = tokio::spawn(actor.run());
        Self {
            handle: LinkHandle { tx: cmd_tx, state: state_rx, message: msg_rx },
            task,
        }
    }

    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }
}

impl Drop for ControlLink {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Outcome of one connected session, deciding what the actor does next.
enum SessionEnd {
    /// Close code 1000 or local teardown: terminal, no retry.
    Normal,
    /// Abnormal close or transport error: retry with backoff.
    Abnormal,
    /// Manual reconnect requested while connected.
    Redial,
}

struct LinkActor<T: ControlTransport> {
    transport: T,
    config: LinkConfig,
    url: String,
    state: watch::Sender<LinkState>,
    message: watch::Sender<Option<String>>,
    rx: mpsc::UnboundedReceiver<Cmd>,
    calibration: Option<CalibrationValues>,
}

impl<T: ControlTransport> LinkActor<T> {
    fn set_state(&self, s: LinkState) {
        if *self.state.borrow() != s {
            debug!("link: state -> {:?}", s);
        }
        let _ = self.state.send(s);
    }

    async fn run(mut self) {
        let mut attempts: u32 = 0;
        loop {
            self.set_state(LinkState::Connecting);
            match self.transport.connect(&self.url).await {
                Ok(conn) => {
                    attempts = 0;
                    info!("link: connected to {}", self.url);
                    match self.run_session(conn).await {
                        SessionEnd::Normal => {
                            self.set_state(LinkState::Disconnected);
                            return;
                        }
                        SessionEnd::Abnormal => {}
                        SessionEnd::Redial => continue,
                    }
                }
                Err(e) => warn!("link: connect to {} failed: {:#}", self.url, e),
            }

            attempts += 1;
            if attempts > self.config.max_attempts {
                warn!("link: reconnect budget exhausted after {} attempts", self.config.max_attempts);
                self.set_state(LinkState::Failed);
                if !self.wait_for_manual_reconnect().await {
                    self.set_state(LinkState::Disconnected);
                    return;
                }
                attempts = 0;
                continue;
            }

            let delay = self.config.backoff_delay(attempts);
            info!(
                "link: reconnect attempt {}/{} in {}ms",
                attempts,
                self.config.max_attempts,
                delay.as_millis()
            );
            self.set_state(LinkState::Reconnecting);
            if !self.backoff(delay, &mut attempts).await {
                self.set_state(LinkState::Disconnected);
                return;
            }
        }
    }

    /// One connected session: greeting, settle-delayed calibration push,
    /// then demux of inbound events and consumer commands.
    async fn run_session(&mut self, mut conn: T::Conn) -> SessionEnd {
        self.set_state(LinkState::Connected);
        if let Err(e) = conn.send(&self.config.greeting).await {
            warn!("link: greeting failed: {:#}", e);
            return SessionEnd::Abnormal;
        }

        let settle = tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms));
        tokio::pin!(settle);
        let mut settled = false;

        loop {
            tokio::select! {
                _ = &mut settle, if !settled => {
                    settled = true;
                    if let Some(calib) = &self.calibration {
                        info!("link: pushing calibration");
                        if let Err(e) = conn.send(&encode_calibration(calib)).await {
                            warn!("link: calibration push failed: {:#}", e);
                            return SessionEnd::Abnormal;
                        }
                    }
                }
                ev = conn.next_event() => match ev {
                    TransportEvent::Message(m) => {
                        debug!("link: received {:?}", m);
                        let _ = self.message.send(Some(m));
                    }
                    TransportEvent::Closed { code, reason } => {
                        if code == NORMAL_CLOSE {
                            info!("link: closed normally by peer");
                            return SessionEnd::Normal;
                        }
                        warn!("link: connection lost (code {}, {:?})", code, reason);
                        return SessionEnd::Abnormal;
                    }
                },
                cmd = self.rx.recv() => match cmd {
                    Some(Cmd::Send(payload)) => {
                        if let Err(e) = conn.send(&payload).await {
                            warn!("link: send failed: {:#}", e);
                            return SessionEnd::Abnormal;
                        }
                    }
                    Some(Cmd::SetCalibration(c)) => self.calibration = Some(*c),
                    Some(Cmd::Reconnect) => {
                        info!("link: manual reconnect while connected");
                        conn.close(NORMAL_CLOSE).await;
                        return SessionEnd::Redial;
                    }
                    Some(Cmd::Close) | None => {
                        conn.close(NORMAL_CLOSE).await;
                        return SessionEnd::Normal;
                    }
                },
            }
        }
    }

    /// Cancellable backoff sleep. Returns false on teardown; a manual
    /// reconnect resets the counter and cuts the delay short.
    async fn backoff(&mut self, delay: Duration, attempts: &mut u32) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                cmd = self.rx.recv() => match cmd {
                    Some(Cmd::Send(payload)) => {
                        warn!("link: not connected, dropping {:?}", payload);
                    }
                    Some(Cmd::SetCalibration(c)) => self.calibration = Some(*c),
                    Some(Cmd::Reconnect) => {
                        *attempts = 0;
                        return true;
                    }
                    Some(Cmd::Close) | None => return false,
                },
            }
        }
    }

    /// Parked in `Failed` until the consumer asks for a reconnect or tears
    /// the channel down. Returns false on teardown.
    async fn wait_for_manual_reconnect(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Some(Cmd::Send(payload)) => {
                    warn!("link: failed state, dropping {:?}", payload);
                }
                Some(Cmd::SetCalibration(c)) => self.calibration = Some(*c),
                Some(Cmd::Reconnect) => {
                    info!("link: manual reconnect from failed state");
                    return true;
                }
                Some(Cmd::Close) | None => return false,
            }
        }
    }
}
