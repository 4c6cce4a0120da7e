use rotor_proto::CalibrationValues;
use serde::Deserialize;

/// Current pilot input. Mutated only by discrete input events; the
/// dispatch loop reads one atomic snapshot per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Movement {
    /// Collective power, 0..=255. A bounded accumulator: never reset
    /// implicitly, only by explicit reset/land/emergency actions.
    pub throttle: i32,
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YawDirection {
    Left,
    Right,
}

/// Force magnitudes applied while a control is held.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ControlForces {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
    pub throttle_step: i32,
    /// Fixed throttle applied by the takeoff action.
    pub takeoff_throttle: i32,
}

impl Default for ControlForces {
    fn default() -> Self {
        Self { pitch: 80, roll: 80, yaw: 100, throttle_step: 10, takeoff_throttle: 120 }
    }
}

impl From<&CalibrationValues> for ControlForces {
    fn from(calib: &CalibrationValues) -> Self {
        let f = calib.movement_force;
        Self {
            pitch: f.pitch,
            roll: f.roll,
            yaw: f.yaw,
            throttle_step: f.throttle_step,
            ..Self::default()
        }
    }
}

impl Movement {
    pub fn nudge_throttle(&mut self, delta: i32) {
        self.throttle = (self.throttle + delta).clamp(0, 255);
    }

    pub fn neutral_axes(&mut self) {
        self.pitch = 0;
        self.roll = 0;
        self.yaw = 0;
    }
}
