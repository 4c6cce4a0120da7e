use std::time::Duration;

use rotor_proto::command::{all_stop, encode_speed, encode_unified};
use rotor_proto::motor::{MotorId, ALL_MOTORS};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ControlConfig;
use crate::gate::ControlGate;

fn motor_index(motor: MotorId) -> usize {
    ALL_MOTORS.iter().position(|m| *m == motor).unwrap_or(0)
}

/// Per-motor tuning surface (sliders and +/- steps). Each motor's edits
/// are debounced independently: rapid changes coalesce into one send after
/// the debounce window of inactivity on that motor. This cadence is
/// separate from the directional dispatch loop. Debounced sends go through
/// the shared gate, so a halt (emergency stop on the flight surface)
/// silences a timer that is already pending.
pub struct MotorTuner {
    gate: ControlGate,
    values: [i32; 4],
    pending: [Option<JoinHandle<()>>; 4],
    debounce: Duration,
}

impl MotorTuner {
    /// Attaches the surface and zeroes all drive lines once, so a stale
    /// command from a previous session cannot keep a motor spinning.
    pub fn attach(gate: ControlGate, cfg: &ControlConfig) -> Self {
        for c in all_stop() {
            gate.send(c);
        }
        Self {
            gate,
            values: [0; 4],
            pending: [None, None, None, None],
            debounce: Duration::from_millis(cfg.debounce_ms),
        }
    }

    pub fn value(&self, motor: MotorId) -> i32 {
        self.values[motor_index(motor)]
    }

    /// Slider edit: signed speed in [-255, 255].
    pub fn set(&mut self, motor: MotorId, value: f64) {
        let v = if value.is_finite() { value } else { 0.0 };
        let v = v.clamp(-255.0, 255.0).round() as i32;
        self.values[motor_index(motor)] = v;
        self.schedule(motor, v);
    }

    pub fn step_up(&mut self, motor: MotorId) {
        let i = motor_index(motor);
        self.values[i] = (self.values[i] + 1).min(255);
        self.schedule(motor, self.values[i]);
    }

    pub fn step_down(&mut self, motor: MotorId) {
        let i = motor_index(motor);
        self.values[i] = (self.values[i] - 1).max(-255);
        self.schedule(motor, self.values[i]);
    }

    pub fn stop(&mut self, motor: MotorId) {
        self.values[motor_index(motor)] = 0;
        self.schedule(motor, 0);
    }

    fn schedule(&mut self, motor: MotorId, value: i32) {
        let i = motor_index(motor);
        if let Some(task) = self.pending[i].take() {
            task.abort();
        }
        debug!("tuner: motor {:?} -> {} (debounced)", motor, value);
        let gate = self.gate.clone();
        let epoch = gate.epoch();
        let debounce = self.debounce;
        self.pending[i] = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            for c in encode_speed(motor, value) {
                gate.send_scheduled(epoch, c);
            }
        }));
    }

    /// Aborts in-flight debounce timers so nothing fires after a stop or
    /// teardown.
    pub fn cancel_pending(&mut self) {
        for slot in &mut self.pending {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.cancel_pending();
        for c in all_stop() {
            self.gate.send(c);
        }
    }
}

impl Drop for MotorTuner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Unified-power surface: one value drives all four motors through the
/// fixed asymmetric wiring convention. Single debounce window.
pub struct UnifiedTuner {
    gate: ControlGate,
    value: i32,
    pending: Option<JoinHandle<()>>,
    debounce: Duration,
}

impl UnifiedTuner {
    pub fn attach(gate: ControlGate, cfg: &ControlConfig) -> Self {
        for c in all_stop() {
            gate.send(c);
        }
        Self { gate, value: 0, pending: None, debounce: Duration::from_millis(cfg.debounce_ms) }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn set(&mut self, value: f64) {
        let v = if value.is_finite() { value } else { 0.0 };
        self.value = v.clamp(0.0, 255.0).round() as i32;
        self.schedule();
    }

    pub fn step_up(&mut self) {
        self.value = (self.value + 1).min(255);
        self.schedule();
    }

    pub fn step_down(&mut self) {
        self.value = (self.value - 1).max(0);
        self.schedule();
    }

    pub fn stop(&mut self) {
        self.value = 0;
        self.schedule();
    }

    fn schedule(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
        let gate = self.gate.clone();
        let epoch = gate.epoch();
        let value = self.value;
        let debounce = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            for c in encode_unified(value as f64) {
                gate.send_scheduled(epoch, c);
            }
        }));
    }

    pub fn cancel_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    pub fn shutdown(&mut self) {
        self.cancel_pending();
        for c in all_stop() {
            self.gate.send(c);
        }
    }
}

impl Drop for UnifiedTuner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
