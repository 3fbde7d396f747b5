//! Phase-control back-end for TRIACs and random-turn-on SSRs.
//!
//! The driver only computes the firing delay; the gate is driven by the
//! shared [`FiringScheduler`] from the zero-cross and timer interrupts.

use log::error;

use crate::config::DimmerConfig;
use crate::error::Result;
use crate::pins;
use crate::ports::{GpioPort, HwTimer};
use crate::registry::SlotId;
use crate::scheduler::{DELAY_OFF, FiringScheduler};
use crate::telemetry::DriverInfo;

use super::{Driver, FireCommand};

pub struct ThyristorDriver<'a, G, T> {
    scheduler: &'a FiringScheduler<G, T>,
    pin: i32,
    slot: Option<SlotId>,
    /// Last delay handed to the scheduler.
    delay: u16,
    semi_period: u16,
}

impl<'a, G: GpioPort, T: HwTimer> ThyristorDriver<'a, G, T> {
    pub fn new(scheduler: &'a FiringScheduler<G, T>, pin: i32) -> Self {
        Self {
            scheduler,
            pin,
            slot: None,
            delay: DELAY_OFF,
            semi_period: 0,
        }
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    /// Delay after zero-cross at which the gate fires, capped at the
    /// semi-period (= never fires).
    pub fn firing_delay(&self) -> u16 {
        self.delay.min(self.semi_period)
    }

    /// Firing angle in degrees: 0 = full conduction, 180 = off.
    pub fn phase_angle(&self) -> f32 {
        if self.delay >= self.semi_period {
            180.0
        } else {
            180.0 * f32::from(self.delay) / f32::from(self.semi_period)
        }
    }

    fn delay_for(cmd: &FireCommand) -> u16 {
        let semi = cmd.semi_period_us;
        if !cmd.online || semi == 0 || cmd.fire <= 0.0 {
            DELAY_OFF
        } else if cmd.fire >= 1.0 {
            0
        } else {
            // Rounded so a table-linearised fire maps back to the exact
            // table delay.
            ((1.0 - cmd.fire) * f32::from(semi)).round() as u16
        }
    }
}

impl<G: GpioPort, T: HwTimer> Driver for ThyristorDriver<'_, G, T> {
    fn kind(&self) -> &'static str {
        "thyristor"
    }

    fn configure(&mut self, config: &DimmerConfig) {
        if self.slot.is_none() && config.pin != pins::GPIO_NUM_NC {
            self.pin = config.pin;
        }
    }

    fn begin(&mut self) -> Result<()> {
        match self.scheduler.register(self.pin) {
            Ok(slot) => {
                self.slot = Some(slot);
                Ok(())
            }
            Err(e) => {
                error!("thyristor: cannot enable GPIO{}: {}", self.pin, e);
                Err(e)
            }
        }
    }

    fn end(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.scheduler.unregister(slot);
        }
        self.delay = DELAY_OFF;
    }

    fn apply(&mut self, cmd: &FireCommand) -> bool {
        let Some(slot) = self.slot else {
            return false;
        };
        self.semi_period = cmd.semi_period_us;
        self.delay = Self::delay_for(cmd);
        self.scheduler.set_delay(slot, self.delay)
    }

    fn describe(&self, info: &mut DriverInfo) {
        info.pin = Some(self.pin);
        info.firing_delay_us = Some(self.firing_delay());
        info.phase_angle = Some(self.phase_angle());
    }
}
