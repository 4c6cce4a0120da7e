/// The four logical motors of the airframe. Names match the driver pin
/// labels in the vehicle firmware (`A1_IN1`, `A1_IN2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorId {
    A1,
    A2,
    B1,
    B2,
}

pub const ALL_MOTORS: [MotorId; 4] = [MotorId::A1, MotorId::A2, MotorId::B1, MotorId::B2];

impl MotorId {
    /// The two actuation lines of this motor, in (IN1, IN2) order.
    pub fn lines(self) -> (&'static str, &'static str) {
        match self {
            MotorId::A1 => ("A1_IN1", "A1_IN2"),
            MotorId::A2 => ("A2_IN1", "A2_IN2"),
            MotorId::B1 => ("B1_IN1", "B1_IN2"),
            MotorId::B2 => ("B2_IN1", "B2_IN2"),
        }
    }

    /// Fixed wiring sign convention: A1 spins against the other three.
    /// This mirrors the vehicle's driver board, not any aerodynamic law.
    pub fn polarity(self) -> i32 {
        match self {
            MotorId::A1 => 1,
            MotorId::A2 | MotorId::B1 | MotorId::B2 => -1,
        }
    }
}

/// Mixed per-motor speeds, pre-clamp (fields may be negative or above 255).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorSpeeds {
    pub a1: i32,
    pub a2: i32,
    pub b1: i32,
    pub b2: i32,
}

impl MotorSpeeds {
    pub fn get(&self, motor: MotorId) -> i32 {
        match motor {
            MotorId::A1 => self.a1,
            MotorId::A2 => self.a2,
            MotorId::B1 => self.b1,
            MotorId::B2 => self.b2,
        }
    }
}
