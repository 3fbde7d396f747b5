//! GPIO validity rules for the ESP32-S3.
//!
//! Every dimmer back-end checks its pin here before claiming it, so a wrong
//! pin number is a configuration error at `begin()` instead of a silent
//! no-op in the firing interrupt.

/// "Not connected" marker, matching ESP-IDF's `GPIO_NUM_NC`.
pub const GPIO_NUM_NC: i32 = -1;

/// Highest GPIO number present on the ESP32-S3.
pub const GPIO_NUM_MAX: i32 = 48;

/// Output-capable GPIOs: 0–21 and 26–48 (22–25 are not bonded out).
const VALID_OUTPUT_MASK: u64 = ((1u64 << (GPIO_NUM_MAX + 1)) - 1) & !(0b1111u64 << 22);

/// True if `pin` can be driven as a digital output.
pub const fn is_valid_output(pin: i32) -> bool {
    pin >= 0 && pin <= GPIO_NUM_MAX && (VALID_OUTPUT_MASK >> pin) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unconnected_and_out_of_range() {
        assert!(!is_valid_output(GPIO_NUM_NC));
        assert!(!is_valid_output(49));
        assert!(!is_valid_output(i32::MAX));
    }

    #[test]
    fn rejects_unbonded_gap() {
        for pin in 22..=25 {
            assert!(!is_valid_output(pin), "GPIO{pin} must be rejected");
        }
    }

    #[test]
    fn accepts_regular_outputs() {
        for pin in [0, 5, 21, 26, 48] {
            assert!(is_valid_output(pin), "GPIO{pin} must be accepted");
        }
    }
}
