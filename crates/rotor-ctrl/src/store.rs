use std::collections::HashMap;
use std::sync::Mutex;

use rotor_proto::CalibrationValues;
use tracing::{info, warn};

/// Storage key used for persisted calibration.
pub const CALIBRATION_KEY: &str = "drone_calibration";

/// On-device persistence is an injected primitive; load/save are
/// fire-and-forget with logged failure, never an error path.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Loads persisted calibration, falling back to defaults on anything
/// missing or unparseable.
pub fn load_calibration(store: &dyn KeyValueStore) -> CalibrationValues {
    match store.get(CALIBRATION_KEY) {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(calib) => {
                info!("store: calibration loaded");
                calib
            }
            Err(e) => {
                warn!("store: stored calibration unreadable ({}), using defaults", e);
                CalibrationValues::default()
            }
        },
        None => CalibrationValues::default(),
    }
}

pub fn save_calibration(store: &dyn KeyValueStore, calib: &CalibrationValues) {
    match serde_json::to_string(calib) {
        Ok(json) => {
            store.set(CALIBRATION_KEY, &json);
            info!("store: calibration saved");
        }
        Err(e) => warn!("store: calibration not saved: {}", e),
    }
}

/// In-memory store for tests and simulation.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.lock().unwrap().insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let store = MemoryStore::default();
        let mut calib = CalibrationValues::default();
        calib.base_throttle = 185;
        calib.pitch_pid.kp = 2.0;
        save_calibration(&store, &calib);
        assert_eq!(load_calibration(&store), calib);
    }

    #[test]
    fn missing_or_corrupt_falls_back_to_defaults() {
        let store = MemoryStore::default();
        assert_eq!(load_calibration(&store), CalibrationValues::default());
        store.set(CALIBRATION_KEY, "{not json");
        assert_eq!(load_calibration(&store), CalibrationValues::default());
    }
}
