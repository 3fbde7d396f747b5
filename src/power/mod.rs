//! Duty cycle → phase angle mapping and power estimation.
//!
//! - [`lut`]: fixed-point, power-linearising firing delay table.
//! - [`harmonics`]: closed-form odd-harmonic spectrum and load metrics.

pub mod harmonics;
pub mod lut;

pub use harmonics::{HarmonicComponent, MAX_HARMONICS, Metrics, harmonic_breakdown};
pub use lut::{FIRING_DELAYS, FiringDelayTable};
