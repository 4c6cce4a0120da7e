use crate::calibration::CalibrationValues;
use crate::motor::{MotorId, MotorSpeeds, ALL_MOTORS};

/// One wire token for a single drive line, e.g. `A1_IN1:180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCommand {
    pub line: &'static str,
    pub value: u8,
}

impl LineCommand {
    pub fn wire(&self) -> String {
        format!("{}:{}", self.line, self.value)
    }
}

fn cmd(line: &'static str, value: u8) -> LineCommand {
    LineCommand { line, value }
}

/// Non-finite inputs (NaN, inf) are treated as 0 rather than rejected.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Signed speed, polarity-adjusted for the motor's wiring, as a pair of
/// one-hot line commands: positive drives IN1, negative drives IN2, zero
/// releases both.
pub fn encode_motor_line(motor: MotorId, value: f64) -> [LineCommand; 2] {
    let v = sanitize(value) * motor.polarity() as f64;
    let v = v.clamp(-255.0, 255.0).round() as i32;
    encode_one_hot(motor, v)
}

/// Same one-hot line encoding without the polarity adjustment. Used where
/// the value is already expressed in the motor's own drive direction
/// (mixed dispatch output, per-motor tuning sliders).
pub fn encode_speed(motor: MotorId, value: i32) -> [LineCommand; 2] {
    encode_one_hot(motor, value.clamp(-255, 255))
}

fn encode_one_hot(motor: MotorId, v: i32) -> [LineCommand; 2] {
    let (in1, in2) = motor.lines();
    if v > 0 {
        [cmd(in1, v as u8), cmd(in2, 0)]
    } else if v < 0 {
        [cmd(in1, 0), cmd(in2, v.unsigned_abs() as u8)]
    } else {
        [cmd(in1, 0), cmd(in2, 0)]
    }
}

/// Standard X-configuration quadrotor mix. Pitch and roll corrections are
/// additive front/back and left/right; yaw adds and subtracts diagonally.
pub fn mix_quadrotor_x(throttle: i32, pitch: i32, roll: i32, yaw: i32) -> MotorSpeeds {
    MotorSpeeds {
        a1: throttle + pitch + roll + yaw,
        a2: throttle + pitch - roll - yaw,
        b1: throttle - pitch + roll - yaw,
        b2: throttle - pitch - roll + yaw,
    }
}

/// Clamp mixed speeds to the actuation range. The drive lines are
/// unidirectional, so the dispatched output is never negative.
pub fn clamp_speeds(speeds: MotorSpeeds) -> MotorSpeeds {
    MotorSpeeds {
        a1: speeds.a1.clamp(0, 255),
        a2: speeds.a2.clamp(0, 255),
        b1: speeds.b1.clamp(0, 255),
        b2: speeds.b2.clamp(0, 255),
    }
}

/// Full per-tick dispatch payload: mix, clamp, encode all eight lines.
pub fn encode_movement(throttle: i32, pitch: i32, roll: i32, yaw: i32) -> [LineCommand; 8] {
    let speeds = clamp_speeds(mix_quadrotor_x(throttle, pitch, roll, yaw));
    let mut out = [cmd("", 0); 8];
    for (i, motor) in ALL_MOTORS.iter().enumerate() {
        let pair = encode_speed(*motor, speeds.get(*motor));
        out[i * 2] = pair[0];
        out[i * 2 + 1] = pair[1];
    }
    out
}

/// Unified-power mode: one value drives all four motors "downward".
/// A1 takes the value on IN1, A2/B1/B2 take it on IN2. The asymmetry is
/// the vehicle's wiring convention and must be reproduced exactly.
pub fn encode_unified(value: f64) -> [LineCommand; 8] {
    let v = sanitize(value).clamp(0.0, 255.0).round();
    let mut out = [cmd("", 0); 8];
    for (i, motor) in ALL_MOTORS.iter().enumerate() {
        let pair = encode_motor_line(*motor, v);
        out[i * 2] = pair[0];
        out[i * 2 + 1] = pair[1];
    }
    out
}

/// Fail-safe payload: every line zero.
pub fn all_stop() -> [LineCommand; 8] {
    let mut out = [cmd("", 0); 8];
    for (i, motor) in ALL_MOTORS.iter().enumerate() {
        let (in1, in2) = motor.lines();
        out[i * 2] = cmd(in1, 0);
        out[i * 2 + 1] = cmd(in2, 0);
    }
    out
}

/// Calibration wire token: `CALIB:` + compact JSON.
pub fn encode_calibration(calib: &CalibrationValues) -> String {
    // serde_json cannot fail on this plain struct
    let json = serde_json::to_string(calib).unwrap_or_default();
    format!("CALIB:{}", json)
}
