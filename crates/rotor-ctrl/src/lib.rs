//! Pilot-facing control surfaces: the movement record mutated by input
//! events, the fixed-cadence dispatch loop that turns it into motor
//! commands, and the debounced per-motor tuning surfaces.

pub mod config;
pub mod dispatch;
pub mod gate;
pub mod movement;
pub mod store;
pub mod tuning;

pub use config::{ClientConfig, ControlConfig};
pub use dispatch::FlightController;
pub use gate::ControlGate;
pub use movement::{ControlForces, Direction, Movement, YawDirection};
pub use store::{load_calibration, save_calibration, KeyValueStore, MemoryStore};
pub use tuning::{MotorTuner, UnifiedTuner};
