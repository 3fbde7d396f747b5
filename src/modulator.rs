//! Burst-fire (cycle stealing) modulator for zero-cross SSRs.
//!
//! Instead of chopping each half-wave, whole half-cycles are let through or
//! skipped. Every semi-period boundary each dimmer adds its fire ratio to a
//! debt accumulator and conducts once a full half-cycle is owed, subject to
//! a DC balance rule: a dimmer whose last conducted half-cycle had polarity
//! `p` may only conduct again at polarity `-p` (or at either polarity once
//! balanced). The running sum of conducted polarities therefore stays
//! within ±1 and the load never sees a DC component.
//!
//! ```text
//!   fire = 0.5    + - + - + - + -
//!   conduct       . X . X . X . X     (balance: 0 -1 0 -1 ...)
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::pins;
use crate::ports::{GpioPort, HwTimer};
use crate::power::lut::clamp_unit;
use crate::registry::{Registry, SlotId};

#[derive(Debug)]
struct ModulatedSlot {
    pin: i32,
    fire: f32,
    debt: f32,
    /// Sum of conducted polarities, always in `-1..=1`.
    balance: i8,
    conducting: bool,
}

/// Observable modulation state of one dimmer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationState {
    pub fire: f32,
    pub debt: f32,
    pub balance: i8,
    pub conducting: bool,
}

/// Shared-timer integral-cycle modulator.
pub struct CycleStealingModulator<G, T> {
    gpio: G,
    timer: T,
    slots: Mutex<CriticalSectionRawMutex, RefCell<Registry<ModulatedSlot>>>,
    /// Polarity of the half-cycle that started at the last boundary.
    /// Tracks every boundary, dropped ones included.
    positive: AtomicBool,
    /// Set while a boundary is being processed.
    busy: AtomicBool,
    /// Period the periodic alarm is armed with, 0 when idle.
    alarm_period: AtomicU16,
}

impl<G: GpioPort, T: HwTimer> CycleStealingModulator<G, T> {
    pub const fn new(gpio: G, timer: T) -> Self {
        Self {
            gpio,
            timer,
            slots: Mutex::new(RefCell::new(Registry::new())),
            positive: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            alarm_period: AtomicU16::new(0),
        }
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn len(&self) -> usize {
        self.slots.lock(|s| s.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `pin` for a new SSR, initially off.
    pub fn register(&self, pin: i32) -> Result<SlotId> {
        if !pins::is_valid_output(pin) || !self.gpio.configure_output(pin) {
            return Err(ConfigError::InvalidPin(pin).into());
        }
        self.gpio.set_level(pin, false);

        if !self.timer.is_running() {
            info!("cycle stealing: starting timer");
            self.timer.start()?;
        }

        let slot = ModulatedSlot {
            pin,
            fire: 0.0,
            debt: 0.0,
            balance: 0,
            conducting: false,
        };
        match self.slots.lock(|s| s.borrow_mut().insert(slot)) {
            Ok(id) => {
                debug!("cycle stealing: registered GPIO{} as {:?}", pin, id);
                Ok(id)
            }
            Err(_) => {
                warn!("cycle stealing: no free slot for GPIO{}", pin);
                Err(ConfigError::RegistryFull.into())
            }
        }
    }

    pub fn unregister(&self, id: SlotId) {
        let (removed, now_empty) = self.slots.lock(|s| {
            let mut slots = s.borrow_mut();
            let removed = slots.remove(id);
            (removed, slots.is_empty())
        });
        let Some(slot) = removed else { return };

        self.gpio.set_level(slot.pin, false);
        debug!("cycle stealing: unregistered GPIO{}", slot.pin);

        if now_empty {
            info!("cycle stealing: stopping timer");
            self.timer.stop();
            self.alarm_period.store(0, Ordering::Release);
        }
    }

    /// Set the fraction of half-cycles `id` should conduct.
    pub fn set_fire(&self, id: SlotId, fire: f32) -> bool {
        let fire = clamp_unit(fire);
        self.slots.lock(|s| match s.borrow_mut().get_mut(id) {
            Some(slot) => {
                slot.fire = fire;
                true
            }
            None => false,
        })
    }

    /// Arm the boundary alarm every `semi_period_us`, or idle it with 0.
    /// Re-arms only when the period actually changes.
    pub fn configure_alarm(&self, semi_period_us: u16) -> Result<()> {
        let armed = self.alarm_period.load(Ordering::Acquire);
        if semi_period_us == armed {
            return Ok(());
        }
        if semi_period_us == 0 {
            self.timer.set_periodic_alarm(None)?;
            debug!("cycle stealing: alarm idle");
        } else {
            self.timer.set_periodic_alarm(Some(u32::from(semi_period_us)))?;
            debug!("cycle stealing: alarm every {} us", semi_period_us);
        }
        self.alarm_period.store(semi_period_us, Ordering::Release);
        Ok(())
    }

    /// Period the boundary alarm is currently armed with.
    pub fn alarm_period(&self) -> Option<u16> {
        match self.alarm_period.load(Ordering::Acquire) {
            0 => None,
            p => Some(p),
        }
    }

    pub fn state(&self, id: SlotId) -> Option<ModulationState> {
        self.slots.lock(|s| {
            s.borrow().get(id).map(|slot| ModulationState {
                fire: slot.fire,
                debt: slot.debt,
                balance: slot.balance,
                conducting: slot.conducting,
            })
        })
    }

    /// Zero-cross notification: re-align the boundary alarm with the grid.
    pub fn on_zero_cross(&self) {
        let _ = self.timer.set_count(0);
    }

    /// Semi-period boundary, called from the periodic timer alarm.
    ///
    /// A boundary arriving while the previous one is still being processed
    /// is dropped, never queued; the grid polarity still advances.
    pub fn on_alarm(&self) {
        let positive = !self.positive.fetch_xor(true, Ordering::AcqRel);
        if self.busy.swap(true, Ordering::AcqRel) {
            return;
        }
        let polarity: i8 = if positive { 1 } else { -1 };

        self.slots.lock(|s| {
            for slot in s.borrow_mut().values_mut() {
                let conduct = if slot.fire >= 1.0 {
                    true
                } else if slot.fire <= 0.0 {
                    false
                } else {
                    slot.debt += slot.fire;
                    let allowed = slot.balance == 0 || slot.balance == -polarity;
                    if slot.debt >= 1.0 && allowed {
                        slot.debt -= 1.0;
                        slot.balance += polarity;
                        true
                    } else {
                        false
                    }
                };
                if conduct != slot.conducting {
                    self.gpio.set_level(slot.pin, conduct);
                    slot.conducting = conduct;
                }
            }
        });

        self.busy.store(false, Ordering::Release);
    }
}
