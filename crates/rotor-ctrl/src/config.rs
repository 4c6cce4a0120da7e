use serde::Deserialize;

use rotor_link::LinkConfig;
use rotor_scan::ScanConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Directional dispatch cadence.
    pub dispatch_period_ms: u64,
    /// Per-motor edit debounce window.
    pub debounce_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { dispatch_period_ms: 100, debounce_ms: 100 }
    }
}

/// Whole-client configuration, one section per subsystem.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub scan: ScanConfig,
    pub link: LinkConfig,
    pub control: ControlConfig,
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
