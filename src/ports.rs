//! Port traits: the boundary between the firing logic and the peripherals.
//!
//! ```text
//!   Scheduler / Modulator ──▶ GpioPort + HwTimer ──▶ ESP-IDF | simulation
//! ```
//!
//! Both traits take `&self`: the firing interrupt and task context share one
//! instance, and the underlying registers are interior-mutable anyway. Every
//! method must be callable from interrupt context (no allocation, no
//! blocking).
//!
//! PWM channels and I2C buses are not modelled here; the PWM and DAC
//! back-ends take the `embedded-hal` 1.0 traits directly.

use crate::error::TimerError;

// ───────────────────────────────────────────────────────────────
// GPIO port
// ───────────────────────────────────────────────────────────────

/// Raw digital output access by GPIO number.
pub trait GpioPort {
    /// Configure `pin` as a push-pull output.
    fn configure_output(&self, pin: i32) -> bool;

    /// Drive `pin` high (conducting) or low (blocking).
    fn set_level(&self, pin: i32, high: bool);
}

// ───────────────────────────────────────────────────────────────
// Hardware timer port
// ───────────────────────────────────────────────────────────────

/// A 1 MHz up-counting hardware timer with one alarm.
///
/// The counter is signed so that a zero-cross notified *before* the real
/// zero crossing can park the counter at a negative value and let it run up
/// through zero.
pub trait HwTimer {
    /// Allocate, enable and start the timer. Called when the first dimmer
    /// registers.
    fn start(&self) -> Result<(), TimerError>;

    /// Stop and release the timer. Called when the last dimmer leaves.
    fn stop(&self);

    /// Whether `start` succeeded and `stop` has not been called since.
    fn is_running(&self) -> bool;

    /// Current counter value in microseconds.
    fn count(&self) -> Result<i64, TimerError>;

    /// Overwrite the counter.
    fn set_count(&self, count: i64) -> Result<(), TimerError>;

    /// Arm a one-shot alarm at `count`, or disarm with `None`.
    fn set_alarm(&self, count: Option<i64>) -> Result<(), TimerError>;

    /// Arm an auto-reloading alarm every `period_us` (counter reloads to 0),
    /// or disarm with `None`.
    fn set_periodic_alarm(&self, period_us: Option<u32>) -> Result<(), TimerError>;
}
