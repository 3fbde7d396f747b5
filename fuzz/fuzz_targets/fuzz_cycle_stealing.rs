//! Fuzz target: `CycleStealingModulator` DC balance
//!
//! Random fire ratios and boundary counts for a few SSRs; the polarity
//! balance of every slot must stay within one half-cycle.
//!
//! cargo fuzz run fuzz_cycle_stealing

#![no_main]

use acdimmer::drivers::gpio::SimGpio;
use acdimmer::drivers::hw_timer::SimTimer;
use acdimmer::CycleStealingModulator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let m = CycleStealingModulator::new(SimGpio::new(), SimTimer::new());
    let slots: Vec<_> = [4, 5, 6].iter().filter_map(|&pin| m.register(pin).ok()).collect();
    if slots.is_empty() {
        return;
    }

    for chunk in data.chunks_exact(6) {
        let slot = slots[usize::from(chunk[0]) % slots.len()];
        let fire = f32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]);
        m.set_fire(slot, fire);

        for _ in 0..chunk[5] {
            m.on_alarm();
        }
        for &id in &slots {
            let state = m.state(id).expect("registered slot");
            assert!((-1..=1).contains(&state.balance), "{state:?}");
            assert!(state.debt < 3.0, "{state:?}");
        }
    }
});
