//! Unified error types for the dimmer library.
//!
//! A single `Error` enum that every subsystem converts into. All variants
//! are `Copy` so they can be produced and passed around without allocation,
//! including from code that runs next to interrupt handlers.
//!
//! Timing violations (an actuator that would fire after its deadline) are
//! deliberately absent: the schedulers drop that half-cycle instead of
//! reporting an error.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the library funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid configuration, detected at configuration time.
    Config(ConfigError),
    /// A peripheral rejected a write or failed to initialise.
    Hardware(HardwareError),
    /// The shared hardware timer could not be driven.
    Timer(TimerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The GPIO cannot be used as an output on this chip.
    InvalidPin(i32),
    /// The power LUT needs a semi-period and none was provided or set.
    SemiPeriodRequired,
    /// The I2C DAC model is unknown, so its resolution is unknown.
    UnknownSku,
    /// Every slot of the registered-dimmer arena is taken.
    RegistryFull,
    /// A configuration field is out of range.
    OutOfRange(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "invalid output pin {pin}"),
            Self::SemiPeriodRequired => write!(f, "semi-period required for power LUT"),
            Self::UnknownSku => write!(f, "unknown DAC SKU"),
            Self::RegistryFull => write!(f, "too many dimmers registered"),
            Self::OutOfRange(field) => write!(f, "{field} out of range"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

/// Transient peripheral failures. The dimmer state stays consistent and the
/// next `set_duty_cycle` retries the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// PWM channel attach or duty write failed.
    PwmWriteFailed,
    /// I2C transaction was not acknowledged.
    I2cNack,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::I2cNack => write!(f, "I2C NACK"),
        }
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Timer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// No hardware timer could be allocated. Resource exhaustion: the
    /// caller must treat this as fatal.
    Allocation,
    /// The timer is not running (not allocated yet, or already released).
    NotRunning,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation => write!(f, "hardware timer allocation failed"),
            Self::NotRunning => write!(f, "hardware timer not running"),
        }
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Library-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
