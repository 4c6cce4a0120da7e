use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rotor_link::LinkHandle;
use rotor_proto::LineCommand;
use tracing::debug;

/// Shared transmit gate for every control surface. Scheduled sends
/// (dispatch ticks, debounce timers) carry the epoch they were scheduled
/// in; `halt()` advances the epoch, so a timer that fires after a halt
/// drops its frames instead of putting them on the wire behind the
/// all-stop.
#[derive(Clone)]
pub struct ControlGate {
    link: LinkHandle,
    epoch: Arc<AtomicU64>,
}

impl ControlGate {
    pub fn new(link: LinkHandle) -> Self {
        Self { link, epoch: Arc::new(AtomicU64::new(0)) }
    }

    /// Epoch to tag a scheduled send with.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidates every send scheduled before this point. New schedules
    /// pick up the fresh epoch and transmit normally.
    pub fn halt(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Immediate transmit, not subject to a halt (stop frames themselves).
    pub fn send(&self, cmd: LineCommand) {
        let _ = self.link.send(cmd.wire());
    }

    /// Transmit for a send scheduled in `epoch`; dropped when a halt has
    /// happened since.
    pub fn send_scheduled(&self, epoch: u64, cmd: LineCommand) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("gate: halted since scheduling, dropping {}", cmd.wire());
            return;
        }
        let _ = self.link.send(cmd.wire());
    }
}
