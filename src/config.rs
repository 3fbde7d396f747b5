//! Dimmer configuration parameters and the shared grid timing handle.
//!
//! Nothing here is persisted: the application builds a [`DimmerConfig`]
//! (from its own settings store, a provisioning message, …) and applies it
//! at runtime with [`Dimmer::configure`](crate::dimmer::Dimmer::configure).

use core::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Nominal mains frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridFrequency {
    Hz50,
    Hz60,
}

impl GridFrequency {
    /// Half of one AC period in microseconds.
    pub const fn semi_period_us(self) -> u16 {
        match self {
            Self::Hz50 => 10_000,
            Self::Hz60 => 8_333,
        }
    }

    pub const fn hz(self) -> f32 {
        match self {
            Self::Hz50 => 50.0,
            Self::Hz60 => 60.0,
        }
    }
}

/// Semi-period shared by every dimmer on the same grid.
///
/// One writer (the zero-cross / frequency measurement code, or the
/// application) and many readers. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct SemiPeriod(Arc<AtomicU16>);

impl SemiPeriod {
    pub fn new(us: u16) -> Self {
        Self(Arc::new(AtomicU16::new(us)))
    }

    pub fn from_frequency(freq: GridFrequency) -> Self {
        Self::new(freq.semi_period_us())
    }

    /// Semi-period in µs; 0 means unknown.
    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, us: u16) {
        self.0.store(us, Ordering::Release);
    }
}

/// Per-dimmer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimmerConfig {
    // --- Output ---
    /// Gate / SSR / PWM GPIO. Ignored by I2C back-ends.
    pub pin: i32,

    // --- Grid ---
    /// Semi-period in µs (0 = not known yet).
    pub semi_period_us: u16,

    // --- Duty cycle ---
    /// Upper bound applied to every requested duty cycle.
    pub duty_cycle_limit: f32,
    /// Remapped "0" of the duty range.
    pub duty_cycle_min: f32,
    /// Remapped "1" of the duty range.
    pub duty_cycle_max: f32,
    /// Linearise power through the firing delay table.
    pub power_lut: bool,

    // --- PWM back-end ---
    pub pwm_frequency_hz: u32,
    pub pwm_resolution_bits: u8,
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self {
            pin: pins::GPIO_NUM_NC,
            semi_period_us: 0,
            duty_cycle_limit: 1.0,
            duty_cycle_min: 0.0,
            duty_cycle_max: 1.0,
            power_lut: false,
            pwm_frequency_hz: 1_000,
            pwm_resolution_bits: 12,
        }
    }
}

impl DimmerConfig {
    /// Reject values that the dimmer setters would otherwise silently clamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.duty_cycle_limit) {
            return Err(ConfigError::OutOfRange("duty_cycle_limit"));
        }
        if !unit.contains(&self.duty_cycle_min) {
            return Err(ConfigError::OutOfRange("duty_cycle_min"));
        }
        if !unit.contains(&self.duty_cycle_max) || self.duty_cycle_max < self.duty_cycle_min {
            return Err(ConfigError::OutOfRange("duty_cycle_max"));
        }
        if self.power_lut && self.semi_period_us == 0 {
            return Err(ConfigError::SemiPeriodRequired);
        }
        if self.pwm_frequency_hz == 0 {
            return Err(ConfigError::OutOfRange("pwm_frequency_hz"));
        }
        if !(1..=16).contains(&self.pwm_resolution_bits) {
            return Err(ConfigError::OutOfRange("pwm_resolution_bits"));
        }
        Ok(())
    }
}
