//! Burst-fire back-end for zero-cross SSRs, driven by the shared
//! [`CycleStealingModulator`].

use log::error;

use crate::config::DimmerConfig;
use crate::error::Result;
use crate::modulator::CycleStealingModulator;
use crate::pins;
use crate::ports::{GpioPort, HwTimer};
use crate::power::harmonics::integral_cycle_harmonics;
use crate::registry::SlotId;
use crate::telemetry::DriverInfo;

use super::{Driver, FireCommand};

pub struct CycleStealingDriver<'a, G, T> {
    modulator: &'a CycleStealingModulator<G, T>,
    pin: i32,
    slot: Option<SlotId>,
}

impl<'a, G: GpioPort, T: HwTimer> CycleStealingDriver<'a, G, T> {
    pub fn new(modulator: &'a CycleStealingModulator<G, T>, pin: i32) -> Self {
        Self {
            modulator,
            pin,
            slot: None,
        }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }
}

impl<G: GpioPort, T: HwTimer> Driver for CycleStealingDriver<'_, G, T> {
    fn kind(&self) -> &'static str {
        "cycle_stealing"
    }

    fn configure(&mut self, config: &DimmerConfig) {
        if self.slot.is_none() && config.pin != pins::GPIO_NUM_NC {
            self.pin = config.pin;
        }
    }

    fn begin(&mut self) -> Result<()> {
        match self.modulator.register(self.pin) {
            Ok(slot) => {
                self.slot = Some(slot);
                Ok(())
            }
            Err(e) => {
                error!("cycle stealing: cannot enable GPIO{}: {}", self.pin, e);
                Err(e)
            }
        }
    }

    fn end(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.modulator.unregister(slot);
        }
    }

    fn apply(&mut self, cmd: &FireCommand) -> bool {
        let Some(slot) = self.slot else {
            return false;
        };
        let fire = if cmd.online { cmd.fire } else { 0.0 };
        if !self.modulator.set_fire(slot, fire) {
            return false;
        }
        self.modulator.configure_alarm(cmd.semi_period_us).is_ok()
    }

    fn harmonics(&self, fire: f32, out: &mut [f32]) -> bool {
        integral_cycle_harmonics(fire, out)
    }

    fn describe(&self, info: &mut DriverInfo) {
        info.pin = Some(self.pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::gpio::SimGpio;
    use crate::drivers::hw_timer::SimTimer;

    #[test]
    fn apply_arms_boundary_alarm() {
        let m = CycleStealingModulator::new(SimGpio::new(), SimTimer::new());
        let mut d = CycleStealingDriver::new(&m, 6);
        d.begin().unwrap();
        assert!(d.apply(&FireCommand {
            online: true,
            fire: 0.3,
            semi_period_us: 10_000,
        }));
        assert_eq!(m.alarm_period(), Some(10_000));
        assert_eq!(m.state(d.slot().unwrap()).unwrap().fire, 0.3);

        assert!(d.apply(&FireCommand {
            online: false,
            fire: 0.3,
            semi_period_us: 10_000,
        }));
        assert_eq!(m.state(d.slot().unwrap()).unwrap().fire, 0.0);
        d.end();
        assert!(!m.timer().is_running());
    }

    #[test]
    fn burst_fire_has_no_odd_harmonics() {
        let m = CycleStealingModulator::new(SimGpio::new(), SimTimer::new());
        let d = CycleStealingDriver::new(&m, 6);
        let mut h = [1.0f32; 3];
        assert!(d.harmonics(0.5, &mut h));
        assert_eq!(h, [100.0, 0.0, 0.0]);
    }
}
