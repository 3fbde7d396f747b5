//! Fuzz target: `FiringScheduler` interrupt interleavings
//!
//! Interprets the input as a sequence of register / unregister / delay /
//! zero-cross / alarm / time-advance operations and asserts that the
//! scheduler never panics and that unregistered gates are always low.
//!
//! cargo fuzz run fuzz_scheduler

#![no_main]

use acdimmer::drivers::gpio::SimGpio;
use acdimmer::drivers::hw_timer::SimTimer;
use acdimmer::ports::HwTimer;
use acdimmer::FiringScheduler;
use libfuzzer_sys::fuzz_target;

const PINS: [i32; 4] = [4, 5, 6, 7];

fuzz_target!(|data: &[u8]| {
    let s = FiringScheduler::new(SimGpio::new(), SimTimer::new());
    let mut slots = [None; PINS.len()];

    for chunk in data.chunks_exact(3) {
        let which = usize::from(chunk[0] >> 4) % PINS.len();
        let arg = i16::from_le_bytes([chunk[1], chunk[2]]);
        match chunk[0] % 6 {
            0 => {
                if slots[which].is_none() {
                    slots[which] = s.register(PINS[which]).ok();
                }
            }
            1 => {
                if let Some(id) = slots[which].take() {
                    s.unregister(id);
                    assert!(!s.gpio().level(PINS[which]));
                }
            }
            2 => {
                if let Some(id) = slots[which] {
                    s.set_delay(id, arg as u16);
                }
            }
            3 => s.on_zero_cross(arg),
            4 => s.on_alarm(),
            _ => {
                if s.timer().is_running() {
                    s.timer().advance(i64::from(arg.unsigned_abs()));
                }
            }
        }

        for (pin, slot) in PINS.iter().zip(&slots) {
            if slot.is_none() {
                assert!(!s.gpio().level(*pin));
            }
        }
        assert_eq!(s.timer().is_running(), !s.is_empty());
    }
});
