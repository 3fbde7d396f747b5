//! Power-linearising firing delay table.
//!
//! A naive TRIAC delay of `(1 - d) * semi_period` does not deliver `d` of
//! the power: the energy in a chopped sine half-wave follows
//! `P(φ) = 1 - φ + sin(2πφ) / 2π` for a delay fraction `φ`. The table below
//! is the inverse of that curve sampled at 80 evenly spaced power ratios,
//! scaled to 16 bits (`0xFFFF` = full delay / no power, `0x0000` = no delay /
//! full power).
//!
//! Interpolation is done in fixed point with a 12-bit duty resolution so the
//! result is bit-identical on every platform.

/// Number of table entries.
pub const FIRING_DELAYS_LEN: usize = 80;

/// Duty resolution used to index the table.
const DUTY_RESOLUTION_BITS: u32 = 12;
const DUTY_MAX: u32 = (1 << DUTY_RESOLUTION_BITS) - 1;
/// Maps a 12-bit duty onto `index << 16 | fraction`.
const SLOT_SCALE: u32 = (FIRING_DELAYS_LEN as u32 - 1) * (1 << (16 - DUTY_RESOLUTION_BITS));

/// Immutable 16-bit delay table, monotonically non-increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiringDelayTable([u16; FIRING_DELAYS_LEN]);

/// Sine-square inverse CDF, 80 entries.
#[rustfmt::skip]
pub const FIRING_DELAYS: FiringDelayTable = FiringDelayTable([
    0xffff, 0xdfd3, 0xd734, 0xd10c, 0xcc10, 0xc7cb, 0xc401, 0xc092, 0xbd69, 0xba76,
    0xb7b1, 0xb510, 0xb290, 0xb02a, 0xaddb, 0xaba1, 0xa979, 0xa761, 0xa556, 0xa359,
    0xa166, 0x9f7e, 0x9d9f, 0x9bc8, 0x99f9, 0x9830, 0x966d, 0x94b0, 0x92f8, 0x9144,
    0x8f94, 0x8de7, 0x8c3d, 0x8a96, 0x88f1, 0x874f, 0x85ad, 0x840d, 0x826d, 0x80ce,
    0x7f30, 0x7d91, 0x7bf1, 0x7a51, 0x78af, 0x770d, 0x7568, 0x73c1, 0x7217, 0x706a,
    0x6eba, 0x6d06, 0x6b4e, 0x6991, 0x67ce, 0x6605, 0x6436, 0x625f, 0x6080, 0x5e98,
    0x5ca5, 0x5aa8, 0x589d, 0x5685, 0x545d, 0x5223, 0x4fd4, 0x4d6e, 0x4aee, 0x484d,
    0x4588, 0x4295, 0x3f6c, 0x3bfd, 0x3833, 0x33ee, 0x2ef2, 0x28ca, 0x202b, 0x0000,
]);

impl FiringDelayTable {
    pub const fn entries(&self) -> &[u16; FIRING_DELAYS_LEN] {
        &self.0
    }

    /// Table index bracketing `duty` and the 16-bit fraction between
    /// `index` and `index + 1`.
    pub fn slot(duty: f32) -> (usize, u32) {
        let duty = clamp_unit(duty);
        let fixed = (duty * DUTY_MAX as f32) as u32;
        let slot = fixed * SLOT_SCALE + (SLOT_SCALE >> 1);
        ((slot >> 16) as usize, slot & 0xffff)
    }

    /// Normalised delay in `[0, 0xFFFF]` for a power ratio in `[0, 1]`.
    pub fn normalized_delay(&self, duty: f32) -> u16 {
        let (index, frac) = Self::slot(duty);
        let a = u32::from(self.0[index]);
        let b = u32::from(self.0[index + 1]);
        (a - (((a - b) * frac) >> 16)) as u16
    }

    /// Firing delay in microseconds after zero-cross, rounded to the
    /// nearest microsecond.
    pub fn firing_delay_us(&self, duty: f32, semi_period_us: u16) -> u16 {
        let v = u32::from(self.normalized_delay(duty));
        ((v * u32::from(semi_period_us) + 0x8000) >> 16) as u16
    }

    /// Conduction fraction actually realised for a linearised power ratio.
    /// Exact at both ends.
    pub fn fire_duty_cycle(&self, duty: f32, semi_period_us: u16) -> f32 {
        let duty = clamp_unit(duty);
        if duty == 0.0 {
            return 0.0;
        }
        if duty == 1.0 {
            return 1.0;
        }
        if semi_period_us == 0 {
            return duty;
        }
        let delay = self.firing_delay_us(duty, semi_period_us);
        1.0 - f32::from(delay) / f32::from(semi_period_us)
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
