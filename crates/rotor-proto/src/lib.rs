pub mod calibration;
pub mod command;
pub mod motor;

pub use calibration::CalibrationValues;
pub use command::LineCommand;
pub use motor::{MotorId, MotorSpeeds};
