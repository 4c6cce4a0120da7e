use std::sync::{Arc, Mutex};
use std::time::Duration;

use rotor_proto::command::{all_stop, encode_movement};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ControlConfig;
use crate::gate::ControlGate;
use crate::movement::{ControlForces, Direction, Movement, YawDirection};

/// Directional flight surface: holds the movement record, arms a periodic
/// dispatch task while any control is engaged, and guarantees an all-stop
/// as the final transmission on land, emergency stop and teardown. Stops
/// halt the shared gate first, so a debounce timer pending on any tuning
/// surface attached to the same gate can no longer fire behind the stop.
pub struct FlightController {
    gate: ControlGate,
    movement: Arc<Mutex<Movement>>,
    forces: ControlForces,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl FlightController {
    pub fn new(gate: ControlGate, forces: ControlForces, cfg: &ControlConfig) -> Self {
        Self {
            gate,
            movement: Arc::new(Mutex::new(Movement::default())),
            forces,
            period: Duration::from_millis(cfg.dispatch_period_ms),
            task: None,
        }
    }

    pub fn movement(&self) -> Movement {
        *self.movement.lock().unwrap()
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    fn update(&self, f: impl FnOnce(&mut Movement)) {
        f(&mut self.movement.lock().unwrap());
    }

    /// Starts the periodic dispatch task if idle.
    fn arm(&mut self) {
        if self.task.is_some() {
            return;
        }
        info!("ctrl: dispatch loop armed");
        let gate = self.gate.clone();
        let movement = self.movement.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // one atomic snapshot per tick, all four motors mixed from it
                let epoch = gate.epoch();
                let m = *movement.lock().unwrap();
                debug!("ctrl: tick {:?}", m);
                for c in encode_movement(m.throttle, m.pitch, m.roll, m.yaw) {
                    gate.send_scheduled(epoch, c);
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("ctrl: dispatch loop disarmed");
        }
    }

    /// Fail-safe: zero every drive line regardless of loop state.
    fn send_all_stop(&self) {
        for c in all_stop() {
            self.gate.send(c);
        }
    }

    pub fn press_direction(&mut self, dir: Direction) {
        let f = self.forces;
        self.update(|m| match dir {
            Direction::Forward => m.pitch = f.pitch,
            Direction::Backward => m.pitch = -f.pitch,
            Direction::Left => m.roll = -f.roll,
            Direction::Right => m.roll = f.roll,
        });
        self.arm();
    }

    /// Releasing a directional control resets only its own axis.
    pub fn release_pitch(&mut self) {
        self.update(|m| m.pitch = 0);
    }

    pub fn release_roll(&mut self) {
        self.update(|m| m.roll = 0);
    }

    pub fn press_yaw(&mut self, dir: YawDirection) {
        let f = self.forces;
        self.update(|m| {
            m.yaw = match dir {
                YawDirection::Left => -f.yaw,
                YawDirection::Right => f.yaw,
            }
        });
        self.arm();
    }

    pub fn release_yaw(&mut self) {
        self.update(|m| m.yaw = 0);
    }

    pub fn nudge_throttle(&mut self, delta: i32) {
        self.update(|m| m.nudge_throttle(delta));
    }

    pub fn step_throttle_up(&mut self) {
        self.nudge_throttle(self.forces.throttle_step);
    }

    pub fn step_throttle_down(&mut self) {
        self.nudge_throttle(-self.forces.throttle_step);
    }

    pub fn reset_throttle(&mut self) {
        self.update(|m| m.throttle = 0);
    }

    /// Takeoff. The caller is responsible for having confirmed the action
    /// with the pilot; this applies the fixed takeoff throttle, zeroes the
    /// other axes and arms the loop.
    pub fn take_off(&mut self) {
        let t = self.forces.takeoff_throttle;
        info!("ctrl: takeoff, throttle={}", t);
        self.update(|m| {
            m.throttle = t;
            m.neutral_axes();
        });
        self.arm();
    }

    pub fn land(&mut self) {
        info!("ctrl: landing");
        self.update(|m| *m = Movement::default());
        self.disarm();
        self.gate.halt();
        self.send_all_stop();
    }

    /// Immediate stop. The dispatch task is cancelled and the gate halted
    /// before the stop command goes out, so the all-zero frames are the
    /// last word even with a debounce timer in flight.
    pub fn emergency_stop(&mut self) {
        info!("ctrl: EMERGENCY STOP");
        self.update(|m| *m = Movement::default());
        self.disarm();
        self.gate.halt();
        self.send_all_stop();
    }

    /// Teardown path: same fail-safe as an emergency stop.
    pub fn shutdown(&mut self) {
        self.disarm();
        self.gate.halt();
        self.send_all_stop();
    }
}

impl Drop for FlightController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
