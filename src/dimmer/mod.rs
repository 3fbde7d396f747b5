//! Dimmer front-end: duty cycle bookkeeping shared by every back-end.
//!
//! ```text
//!   set_duty_cycle(d) ──▶ clamp [0, limit] ──▶ remap [min, max] ──▶ LUT? ──▶ fire
//!                                                                        │
//!                                             Driver::apply(FireCommand) ◀┘
//! ```
//!
//! [`Dimmer`] owns the user-facing state and a [`Driver`] that turns the
//! resulting fire duty cycle into hardware actuation: a thyristor delay, a
//! burst-fire ratio, a PWM duty or a DAC code.

pub mod cycle_stealing;
pub mod dfrobot;
pub mod pwm;
pub mod thyristor;
pub mod virtual_dimmer;

use log::{info, warn};

use crate::config::{DimmerConfig, SemiPeriod};
use crate::error::{ConfigError, Result};
use crate::power::harmonics::phase_control_harmonics;
use crate::power::lut::{FIRING_DELAYS, clamp_unit};
use crate::power::{MAX_HARMONICS, Metrics};
use crate::telemetry::{DimmerSnapshot, DriverInfo, PowerState, harmonic_map};

pub use cycle_stealing::CycleStealingDriver;
pub use dfrobot::{DfRobotDriver, Output, Sku};
pub use pwm::PwmDriver;
pub use thyristor::ThyristorDriver;
pub use virtual_dimmer::VirtualDriver;

// ───────────────────────────────────────────────────────────────
// Driver trait
// ───────────────────────────────────────────────────────────────

/// What the front-end asks a back-end to actuate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    /// `Dimmer::is_online()`: when false the output must be off.
    pub online: bool,
    /// Fraction of each half-cycle (or of half-cycles) to conduct.
    pub fire: f32,
    /// Current grid semi-period in µs, 0 when unknown.
    pub semi_period_us: u16,
}

/// Hardware back-end of a [`Dimmer`].
pub trait Driver {
    /// Short type tag reported in telemetry.
    fn kind(&self) -> &'static str;

    /// Pick up back-end specific fields of a configuration.
    fn configure(&mut self, _config: &DimmerConfig) {}

    /// Acquire the hardware. On error the dimmer stays disabled.
    fn begin(&mut self) -> Result<()>;

    /// Force the output off and release the hardware. Must be idempotent.
    fn end(&mut self);

    /// Actuate `cmd`. Returns whether the hardware accepted it.
    fn apply(&mut self, cmd: &FireCommand) -> bool;

    /// Harmonic spectrum produced at `fire`, see
    /// [`phase_control_harmonics`].
    fn harmonics(&self, fire: f32, out: &mut [f32]) -> bool {
        phase_control_harmonics(fire, out)
    }

    /// Fill the back-end specific telemetry fields.
    fn describe(&self, _info: &mut DriverInfo) {}
}

// ───────────────────────────────────────────────────────────────
// Duty cycle state
// ───────────────────────────────────────────────────────────────

/// Duty cycle chain `duty → mapped → fire`, without any hardware.
#[derive(Debug, Clone, PartialEq)]
pub struct DutyCycleState {
    duty_cycle: f32,
    fire: f32,
    limit: f32,
    min: f32,
    max: f32,
}

impl Default for DutyCycleState {
    fn default() -> Self {
        Self {
            duty_cycle: 0.0,
            fire: 0.0,
            limit: 1.0,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl DutyCycleState {
    /// Store `duty` (clamped to `[0, limit]`) and recompute the fire duty
    /// cycle, linearised through the firing delay table when
    /// `lut_semi_period` is given.
    pub fn update(&mut self, duty: f32, lut_semi_period: Option<u16>) {
        self.duty_cycle = clamp_unit(duty).min(self.limit);
        let mapped = self.mapped();
        self.fire = match lut_semi_period {
            Some(semi) => FIRING_DELAYS.fire_duty_cycle(mapped, semi),
            None => mapped,
        };
    }

    pub fn duty_cycle(&self) -> f32 {
        self.duty_cycle
    }

    /// `min + duty · (max − min)`.
    pub fn mapped(&self) -> f32 {
        self.min + self.duty_cycle * (self.max - self.min)
    }

    /// Fire duty cycle as last computed, regardless of online state.
    pub fn fire(&self) -> f32 {
        self.fire
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    fn set_limit(&mut self, limit: f32) {
        self.limit = clamp_unit(limit);
    }

    fn set_min(&mut self, min: f32) {
        self.min = clamp_unit(min).min(self.max);
    }

    fn set_max(&mut self, max: f32) {
        self.max = clamp_unit(max).max(self.min);
    }

    fn force_off(&mut self) {
        self.fire = 0.0;
    }
}

// ───────────────────────────────────────────────────────────────
// Dimmer
// ───────────────────────────────────────────────────────────────

/// A dimmer: duty cycle state plus a hardware back-end.
pub struct Dimmer<D: Driver> {
    driver: D,
    state: DutyCycleState,
    semi_period: SemiPeriod,
    enabled: bool,
    online: bool,
    power_lut: bool,
}

impl<D: Driver> Dimmer<D> {
    /// A disabled, offline dimmer at 0 %. `semi_period` is the grid
    /// handle shared with the zero-cross code.
    pub fn new(driver: D, semi_period: SemiPeriod) -> Self {
        Self {
            driver,
            state: DutyCycleState::default(),
            semi_period,
            enabled: false,
            online: false,
            power_lut: false,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn kind(&self) -> &'static str {
        self.driver.kind()
    }

    /// Apply a configuration. Invalid configurations are rejected as a
    /// whole and leave the dimmer untouched.
    pub fn configure(&mut self, config: &DimmerConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            warn!("{}: rejected configuration: {}", self.kind(), e);
            return Err(e.into());
        }
        self.driver.configure(config);
        if config.semi_period_us > 0 {
            self.semi_period.set(config.semi_period_us);
        }
        self.state.set_limit(config.duty_cycle_limit);
        // Widen first so min/max never clamp against the previous range.
        self.state.set_min(0.0);
        self.state.set_max(config.duty_cycle_max);
        self.state.set_min(config.duty_cycle_min);
        self.enable_power_lut(config.power_lut, 0)
    }

    // --- Lifecycle ---

    /// Acquire the hardware and apply the stored duty cycle.
    pub fn begin(&mut self) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        self.driver.begin()?;
        self.enabled = true;
        info!("{}: enabled", self.kind());
        self.set_duty_cycle(self.state.duty_cycle());
        Ok(())
    }

    /// Switch the output off and release the hardware. Idempotent. The
    /// dimmer must be marked online again after the next `begin`.
    pub fn end(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.online = false;
        self.state.force_off();
        self.apply();
        self.driver.end();
        info!("{}: disabled", self.kind());
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // --- Online state ---

    /// Enabled, marked online, and able to compute its firing (the power
    /// LUT needs a known semi-period).
    pub fn is_online(&self) -> bool {
        self.enabled && self.online && (!self.power_lut || self.semi_period.get() > 0)
    }

    /// Mark the grid (dis)connected. Going offline switches the output off
    /// immediately; coming back re-applies the stored duty cycle.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        if online {
            self.set_duty_cycle(self.state.duty_cycle());
        } else {
            self.state.force_off();
            if self.enabled {
                self.apply();
            }
        }
    }

    // --- Control ---

    /// Request a power level in `[0, 1]`. Out of range values (and NaN)
    /// are clamped. Returns whether the hardware was driven.
    pub fn set_duty_cycle(&mut self, duty: f32) -> bool {
        let lut = self.power_lut.then(|| self.semi_period.get());
        self.state.update(duty, lut);
        self.is_online() && self.apply()
    }

    pub fn on(&mut self) -> bool {
        self.set_duty_cycle(1.0)
    }

    pub fn off(&mut self) -> bool {
        self.set_duty_cycle(0.0)
    }

    pub fn is_on(&self) -> bool {
        self.is_online() && self.state.duty_cycle() > 0.0
    }

    pub fn is_off(&self) -> bool {
        !self.is_on()
    }

    pub fn is_on_at_full_power(&self) -> bool {
        self.state.duty_cycle() >= self.state.max()
    }

    pub fn set_duty_cycle_limit(&mut self, limit: f32) {
        self.state.set_limit(limit);
        self.set_duty_cycle(self.state.duty_cycle());
    }

    pub fn set_duty_cycle_min(&mut self, min: f32) {
        self.state.set_min(min);
        self.set_duty_cycle(self.state.duty_cycle());
    }

    pub fn set_duty_cycle_max(&mut self, max: f32) {
        self.state.set_max(max);
        self.set_duty_cycle(self.state.duty_cycle());
    }

    // --- Power LUT ---

    /// Turn power linearisation on or off. With `semi_period_us == 0` the
    /// current grid semi-period is used, which must already be known.
    pub fn enable_power_lut(&mut self, enable: bool, semi_period_us: u16) -> Result<()> {
        if enable {
            if semi_period_us > 0 {
                self.semi_period.set(semi_period_us);
            } else if self.semi_period.get() == 0 {
                warn!("{}: power LUT needs a semi-period", self.kind());
                return Err(ConfigError::SemiPeriodRequired.into());
            }
        }
        self.power_lut = enable;
        self.set_duty_cycle(self.state.duty_cycle());
        Ok(())
    }

    pub fn is_power_lut_enabled(&self) -> bool {
        self.power_lut
    }

    /// Semi-period used by the LUT, 0 when the LUT is off.
    pub fn power_lut_semi_period(&self) -> u16 {
        if self.power_lut { self.semi_period.get() } else { 0 }
    }

    pub fn semi_period(&self) -> u16 {
        self.semi_period.get()
    }

    /// Update the grid semi-period (shared with every dimmer holding the
    /// same handle) and re-apply this dimmer.
    pub fn set_semi_period(&mut self, semi_period_us: u16) {
        self.semi_period.set(semi_period_us);
        self.set_duty_cycle(self.state.duty_cycle());
    }

    // --- Getters ---

    pub fn duty_cycle(&self) -> f32 {
        self.state.duty_cycle()
    }

    pub fn duty_cycle_mapped(&self) -> f32 {
        self.state.mapped()
    }

    /// Fraction actually conducted, 0 while offline.
    pub fn duty_cycle_fire(&self) -> f32 {
        if self.is_online() { self.state.fire() } else { 0.0 }
    }

    pub fn duty_cycle_limit(&self) -> f32 {
        self.state.limit()
    }

    pub fn duty_cycle_min(&self) -> f32 {
        self.state.min()
    }

    pub fn duty_cycle_max(&self) -> f32 {
        self.state.max()
    }

    // --- Power estimation ---

    /// Delivered / nominal power ratio on a resistive load.
    pub fn power_ratio(&self) -> f32 {
        if !self.is_online() {
            0.0
        } else if self.power_lut {
            self.state.mapped()
        } else {
            self.state.fire()
        }
    }

    /// Harmonic spectrum in percent of H1, `out[i]` = H(2i+1).
    pub fn calculate_harmonics(&self, out: &mut [f32]) -> bool {
        self.enabled && self.driver.harmonics(self.duty_cycle_fire(), out)
    }

    /// Electrical metrics for a resistive load of `load_resistance` Ω on a
    /// grid of `grid_voltage` V RMS.
    pub fn calculate_metrics(&self, metrics: &mut Metrics, grid_voltage: f32, load_resistance: f32) -> bool {
        if !self.enabled {
            return false;
        }
        match Metrics::for_resistive_load(self.power_ratio(), grid_voltage, load_resistance) {
            Some(m) => {
                *metrics = m;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> DimmerSnapshot {
        let mut harmonics = [0.0f32; MAX_HARMONICS];
        let _ = self.calculate_harmonics(&mut harmonics);
        let mut driver = DriverInfo::default();
        self.driver.describe(&mut driver);

        DimmerSnapshot {
            kind: self.kind(),
            enabled: self.enabled,
            online: self.is_online(),
            state: if self.is_on() { PowerState::On } else { PowerState::Off },
            duty_cycle: self.duty_cycle(),
            duty_cycle_mapped: self.duty_cycle_mapped(),
            duty_cycle_fire: self.duty_cycle_fire(),
            duty_cycle_limit: self.duty_cycle_limit(),
            duty_cycle_min: self.duty_cycle_min(),
            duty_cycle_max: self.duty_cycle_max(),
            power_lut: self.power_lut,
            power_lut_semi_period: self.power_lut_semi_period(),
            semi_period: self.semi_period(),
            harmonics: harmonic_map(&harmonics),
            driver,
        }
    }

    fn apply(&mut self) -> bool {
        let cmd = FireCommand {
            online: self.is_online(),
            fire: self.state.fire(),
            semi_period_us: self.semi_period.get(),
        };
        self.driver.apply(&cmd)
    }
}

impl<D: Driver> Drop for Dimmer<D> {
    fn drop(&mut self) {
        self.end();
    }
}
