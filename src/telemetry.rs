//! Serializable dimmer state for status reporting.
//!
//! The snapshot is a plain value: the application serializes it with the
//! format of its choice (JSON for a web UI, MQTT payloads, …). Harmonics
//! are keyed `"H1"`, `"H3"`, … `"H21"`.

use heapless::LinearMap;
use serde::Serialize;

use crate::power::MAX_HARMONICS;

/// Keys of the harmonic map, in order.
pub const HARMONIC_KEYS: [&str; MAX_HARMONICS] = [
    "H1", "H3", "H5", "H7", "H9", "H11", "H13", "H15", "H17", "H19", "H21",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

/// Back-end specific fields. Only the ones a back-end knows are emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriverInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<i32>,
    /// Thyristor: current delay after zero-cross (µs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firing_delay_us: Option<u16>,
    /// Thyristor: firing angle (degrees, 180 = off).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_angle: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_bits: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i2c_address: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
}

/// Full state of one dimmer at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimmerSnapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub enabled: bool,
    pub online: bool,
    pub state: PowerState,
    pub duty_cycle: f32,
    pub duty_cycle_mapped: f32,
    pub duty_cycle_fire: f32,
    pub duty_cycle_limit: f32,
    pub duty_cycle_min: f32,
    pub duty_cycle_max: f32,
    pub power_lut: bool,
    pub power_lut_semi_period: u16,
    pub semi_period: u16,
    pub harmonics: LinearMap<&'static str, f32, MAX_HARMONICS>,
    pub driver: DriverInfo,
}

/// Build the `H1..H21` map from a spectrum; entries past `values` are 0.
pub fn harmonic_map(values: &[f32]) -> LinearMap<&'static str, f32, MAX_HARMONICS> {
    let mut map = LinearMap::new();
    for (i, key) in HARMONIC_KEYS.iter().enumerate() {
        let _ = map.insert(*key, values.get(i).copied().unwrap_or(0.0));
    }
    map
}
