//! Harmonic spectrum and electrical metrics for a resistive load.
//!
//! All formulas assume a purely resistive load (`cos φ = 1`). The current
//! of a phase-chopped sine is expanded in odd harmonics; each magnitude is
//! expressed in percent of the fundamental.

use core::f32::consts::{FRAC_1_SQRT_2, PI};

use heapless::Vec;
use serde::Serialize;

use super::lut::clamp_unit;

/// Harmonic orders reported in telemetry: H1, H3, … H21.
pub const MAX_HARMONICS: usize = 11;

/// Odd harmonics of a phase-controlled current, in percent of H1.
///
/// `out[0]` receives H1 (always 100 when conducting), `out[i]` receives
/// H(2i+1). Returns `false` when `out` is empty or the fundamental
/// vanishes.
pub fn phase_control_harmonics(fire_duty: f32, out: &mut [f32]) -> bool {
    if out.is_empty() {
        return false;
    }
    out.fill(0.0);

    let duty = clamp_unit(fire_duty);
    if duty <= 0.0 {
        return true;
    }
    if duty >= 1.0 {
        out[0] = 100.0;
        return true;
    }

    // α = π (1 - conduction): 90° at half power, where harmonics peak.
    let alpha = PI * (1.0 - duty);
    let i1_rms = ((2.0 / PI) * (PI - alpha + 0.5 * (2.0 * alpha).sin())).sqrt();
    // NaN comes from cancellation near α = π.
    if i1_rms.is_nan() || i1_rms <= 0.001 {
        return false;
    }

    out[0] = 100.0;
    let scale = (2.0 / PI) * FRAC_1_SQRT_2 * 100.0 / i1_rms;
    for (i, h) in out.iter_mut().enumerate().skip(1) {
        let n = (2 * i + 1) as f32;
        let coeff = ((n - 1.0) * alpha).cos() / (n - 1.0) - ((n + 1.0) * alpha).cos() / (n + 1.0);
        *h = coeff.abs() * scale;
    }
    true
}

/// Burst-fire conducts whole half-cycles: no chopping, no odd harmonics.
pub fn integral_cycle_harmonics(fire_duty: f32, out: &mut [f32]) -> bool {
    if out.is_empty() {
        return false;
    }
    out.fill(0.0);
    if clamp_unit(fire_duty) > 0.0 {
        out[0] = 100.0;
    }
    true
}

/// Electrical operating point of a dimmed resistive load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// RMS voltage across the load (V).
    pub voltage: f32,
    /// RMS current through the load (A).
    pub current: f32,
    /// Active power (W).
    pub power: f32,
    /// Apparent power seen by the grid (VA).
    pub apparent_power: f32,
    /// `P / S`; undefined when nothing conducts.
    pub power_factor: Option<f32>,
    /// Current THD in percent; undefined when nothing conducts.
    pub thdi: Option<f32>,
}

impl Metrics {
    /// Metrics for a power ratio `r` (delivered / nominal power).
    ///
    /// Returns `None` for a non-positive grid voltage or load resistance.
    pub fn for_resistive_load(power_ratio: f32, grid_voltage: f32, load_resistance: f32) -> Option<Self> {
        if !(grid_voltage > 0.0 && load_resistance > 0.0) {
            return None;
        }
        let r = clamp_unit(power_ratio);
        if r <= 0.0 {
            return Some(Self::default());
        }
        let nominal_power = grid_voltage * grid_voltage / load_resistance;
        if r >= 1.0 {
            let current = grid_voltage / load_resistance;
            return Some(Self {
                voltage: grid_voltage,
                current,
                power: nominal_power,
                apparent_power: nominal_power,
                power_factor: Some(1.0),
                thdi: Some(0.0),
            });
        }

        let pf = r.sqrt();
        let voltage = pf * grid_voltage;
        let current = voltage / load_resistance;
        Some(Self {
            voltage,
            current,
            power: r * nominal_power,
            apparent_power: grid_voltage * current,
            power_factor: Some(pf),
            thdi: Some(100.0 * (1.0 / r - 1.0).sqrt()),
        })
    }
}

/// Contribution of one harmonic order to the load current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HarmonicComponent {
    /// 1, 3, 5, …
    pub order: u8,
    /// Magnitude in percent of H1.
    pub percent: f32,
    /// RMS current carried by this order (A).
    pub current_rms: f32,
    /// `I_n² · R` (W). Only H1 does useful work on a resistive load.
    pub power: f32,
    /// `order · grid_hz` (Hz).
    pub frequency: f32,
}

/// Split a measured total RMS current into per-harmonic currents and
/// heating power, using a spectrum from [`phase_control_harmonics`].
///
/// `I_total² = I1² · (1 + Σ (Hn/100)²)`.
pub fn harmonic_breakdown(
    harmonics: &[f32],
    total_current_rms: f32,
    load_resistance: f32,
    grid_hz: f32,
) -> Vec<HarmonicComponent, MAX_HARMONICS> {
    let mut out = Vec::new();
    if harmonics.is_empty() {
        return out;
    }

    let sum_squares: f32 = 1.0
        + harmonics
            .iter()
            .skip(1)
            .map(|h| (h / 100.0) * (h / 100.0))
            .sum::<f32>();
    let i1_rms = total_current_rms / sum_squares.sqrt();

    for (i, &percent) in harmonics.iter().take(MAX_HARMONICS).enumerate() {
        let order = (2 * i + 1) as u8;
        let current_rms = i1_rms * percent / 100.0;
        let _ = out.push(HarmonicComponent {
            order,
            percent,
            current_rms,
            power: current_rms * current_rms * load_resistance,
            frequency: grid_hz * f32::from(order),
        });
    }
    out
}
