use serde::{Deserialize, Serialize};

/// PID gains for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Force magnitudes applied per control input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementForce {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
    #[serde(rename = "throttleStep")]
    pub throttle_step: i32,
}

/// Tunable flight constants, edited on the ground and pushed to the vehicle
/// as a single `CALIB:` token whenever the link comes up.
///
/// Field names serialize in the firmware's expected casing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationValues {
    #[serde(rename = "pitchPID")]
    pub pitch_pid: PidGains,
    #[serde(rename = "rollPID")]
    pub roll_pid: PidGains,
    #[serde(rename = "yawPID")]
    pub yaw_pid: PidGains,
    #[serde(rename = "minThrottle")]
    pub min_throttle: i32,
    #[serde(rename = "maxThrottle")]
    pub max_throttle: i32,
    #[serde(rename = "baseThrottle")]
    pub base_throttle: i32,
    #[serde(rename = "movementForce")]
    pub movement_force: MovementForce,
    pub alpha: f64,
    /// Automatic takeoff ramp duration in milliseconds.
    #[serde(rename = "takeoffDuration")]
    pub takeoff_duration_ms: i32,
}

impl Default for CalibrationValues {
    fn default() -> Self {
        Self {
            pitch_pid: PidGains { kp: 1.5, ki: 0.0, kd: 0.8 },
            roll_pid: PidGains { kp: 1.5, ki: 0.0, kd: 0.8 },
            yaw_pid: PidGains { kp: 1.0, ki: 0.0, kd: 0.3 },
            min_throttle: 130,
            max_throttle: 255,
            base_throttle: 170,
            movement_force: MovementForce { pitch: 80, roll: 80, yaw: 100, throttle_step: 10 },
            alpha: 0.96,
            takeoff_duration_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_firmware_field_casing() {
        let json = serde_json::to_string(&CalibrationValues::default()).unwrap();
        for key in [
            "pitchPID", "rollPID", "yawPID",
            "minThrottle", "maxThrottle", "baseThrottle",
            "movementForce", "throttleStep", "alpha", "takeoffDuration",
        ] {
            assert!(json.contains(key), "missing {} in {}", key, json);
        }
    }

    #[test]
    fn round_trip_is_deep_equal() {
        let calib = CalibrationValues {
            pitch_pid: PidGains { kp: 2.25, ki: 0.05, kd: 1.0 },
            base_throttle: 180,
            ..Default::default()
        };
        let json = serde_json::to_string(&calib).unwrap();
        let back: CalibrationValues = serde_json::from_str(&json).unwrap();
        assert_eq!(back, calib);
    }
}
