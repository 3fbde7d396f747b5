//! Fuzz target: duty cycle chain and firing delay table
//!
//! Feeds arbitrary f32 bit patterns (NaN, infinities, subnormals) through
//! the dimmer setters and asserts that every derived value stays in range
//! and the LUT never indexes out of bounds.
//!
//! cargo fuzz run fuzz_firing_delay

#![no_main]

use acdimmer::dimmer::{Dimmer, VirtualDriver};
use acdimmer::power::FIRING_DELAYS;
use acdimmer::SemiPeriod;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut d = Dimmer::new(VirtualDriver::new(), SemiPeriod::new(10_000));
    let _ = d.begin();
    d.set_online(true);

    for chunk in data.chunks_exact(7) {
        let value = f32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]);
        let semi = u16::from_le_bytes([chunk[5], chunk[6]]);
        match chunk[0] % 6 {
            0 => {
                d.set_duty_cycle(value);
            }
            1 => d.set_duty_cycle_limit(value),
            2 => d.set_duty_cycle_min(value),
            3 => d.set_duty_cycle_max(value),
            4 => {
                let _ = d.enable_power_lut(chunk[0] & 0x80 != 0, semi);
            }
            _ => d.set_semi_period(semi),
        }

        assert!((0.0..=d.duty_cycle_limit()).contains(&d.duty_cycle()));
        assert!(d.duty_cycle_min() <= d.duty_cycle_max());
        let fire = d.duty_cycle_fire();
        assert!((0.0..=1.0).contains(&fire), "fire = {fire}");

        let delay = FIRING_DELAYS.firing_delay_us(value, semi);
        assert!(delay <= semi);
    }
});
