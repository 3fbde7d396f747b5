//! Digital output back-ends for gate / SSR drive pins.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`EspGpio`] writes the GPIO output registers directly.
//! On host/test: [`SimGpio`] tracks levels in atomics so the firing ISR
//! can be driven from test threads.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::pins;
use crate::ports::GpioPort;

/// In-memory GPIO bank covering GPIO 0–63.
#[derive(Debug, Default)]
pub struct SimGpio {
    levels: AtomicU64,
    outputs: AtomicU64,
    writes: AtomicU32,
}

impl SimGpio {
    pub const fn new() -> Self {
        Self {
            levels: AtomicU64::new(0),
            outputs: AtomicU64::new(0),
            writes: AtomicU32::new(0),
        }
    }

    /// Current output level of `pin`.
    pub fn level(&self, pin: i32) -> bool {
        Self::bit(pin).is_some_and(|b| self.levels.load(Ordering::Acquire) & b != 0)
    }

    /// Whether `pin` was configured as an output.
    pub fn is_output(&self, pin: i32) -> bool {
        Self::bit(pin).is_some_and(|b| self.outputs.load(Ordering::Acquire) & b != 0)
    }

    /// Total number of level writes since creation.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Acquire)
    }

    fn bit(pin: i32) -> Option<u64> {
        (0..64).contains(&pin).then(|| 1u64 << pin)
    }
}

impl GpioPort for SimGpio {
    fn configure_output(&self, pin: i32) -> bool {
        if !pins::is_valid_output(pin) {
            return false;
        }
        if let Some(b) = Self::bit(pin) {
            self.outputs.fetch_or(b, Ordering::AcqRel);
            self.levels.fetch_and(!b, Ordering::AcqRel);
        }
        true
    }

    fn set_level(&self, pin: i32, high: bool) {
        let Some(b) = Self::bit(pin) else { return };
        if high {
            self.levels.fetch_or(b, Ordering::AcqRel);
        } else {
            self.levels.fetch_and(!b, Ordering::AcqRel);
        }
        self.writes.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(all(target_os = "espidf", feature = "espidf"))]
pub use esp::EspGpio;

#[cfg(all(target_os = "espidf", feature = "espidf"))]
mod esp {
    use esp_idf_sys::*;
    use log::error;

    use crate::ports::GpioPort;

    /// GPIO matrix access through the ESP-IDF driver.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct EspGpio;

    impl GpioPort for EspGpio {
        fn configure_output(&self, pin: i32) -> bool {
            // SAFETY: plain driver calls; `pin` was validated by the caller.
            let rc = unsafe {
                let rc = gpio_reset_pin(pin);
                if rc == ESP_OK {
                    gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT)
                } else {
                    rc
                }
            };
            if rc != ESP_OK {
                error!("gpio: cannot configure GPIO{} as output (rc={})", pin, rc);
                return false;
            }
            self.set_level(pin, false);
            true
        }

        fn set_level(&self, pin: i32, high: bool) {
            // SAFETY: gpio_set_level is IRAM-safe and only touches the
            // output set/clear registers.
            unsafe {
                gpio_set_level(pin, u32::from(high));
            }
        }
    }
}
