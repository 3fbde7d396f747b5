//! Zero-cross synchronised firing scheduler for phase-controlled dimmers.
//!
//! One hardware timer is shared by every registered TRIAC / random SSR.
//! The zero-cross notification resets the counter, forces every dimmer that
//! has a delay back to non-conducting, and arms the alarm at the earliest
//! pending firing time. The alarm handler raises every gate that is due and
//! re-arms for the next one.
//!
//! ```text
//!   ZC ─┐                                                 ┌─ ZC
//!       │ count = 0                                       │
//!       ▼                                                 ▼
//!   ────┬───────────────┬───────────────────┬─────────────┬────
//!       │ 100 %: HIGH   │ alarm: 75 % HIGH  │ alarm: 50 % │
//!       │ 0 %, 50 %, 75 %: LOW              │ HIGH        │
//! ```
//!
//! Per slot the state cycles OFF → WAITING → CONDUCTING → (next ZC).
//!
//! The slot arena is only mutated from task context (`register` /
//! `unregister` / `set_delay`) and walked from both contexts, always inside
//! one critical section. Neither handler allocates or blocks.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::pins;
use crate::ports::{GpioPort, HwTimer};
use crate::registry::{Registry, SlotId};

/// Minimum delay for the grid voltage to reach the level needed to push
/// ~30 mA through a 330 Ω gate resistor:
/// `asin(330 · 0.03 / 325) / π · 10 000 ≈ 97 µs`.
pub const PHASE_DELAY_MIN_US: u16 = 90;

/// Delay / alarm sentinel: the dimmer is off, or already fired this
/// half-cycle.
pub const DELAY_OFF: u16 = u16::MAX;

/// Where a registered dimmer is within the current half-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringState {
    /// Gate held low, nothing pending.
    Off,
    /// Gate low, waiting for its alarm.
    Waiting { at_us: u16 },
    /// Gate high until the next zero-cross.
    Conducting,
}

#[derive(Debug)]
struct FiringSlot {
    pin: i32,
    /// Requested delay after zero-cross: 0 = full power, `DELAY_OFF` = off.
    delay: u16,
    /// Tick at which the gate fires this half-cycle, or `DELAY_OFF`.
    alarm: u16,
    conducting: bool,
}

/// Shared-timer phase-control scheduler.
pub struct FiringScheduler<G, T> {
    gpio: G,
    timer: T,
    slots: Mutex<CriticalSectionRawMutex, RefCell<Registry<FiringSlot>>>,
}

impl<G: GpioPort, T: HwTimer> FiringScheduler<G, T> {
    pub const fn new(gpio: G, timer: T) -> Self {
        Self {
            gpio,
            timer,
            slots: Mutex::new(RefCell::new(Registry::new())),
        }
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Number of registered dimmers.
    pub fn len(&self) -> usize {
        self.slots.lock(|s| s.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `pin` and add a dimmer in the OFF state. Starts the shared
    /// timer on the first registration.
    pub fn register(&self, pin: i32) -> Result<SlotId> {
        if !pins::is_valid_output(pin) || !self.gpio.configure_output(pin) {
            return Err(ConfigError::InvalidPin(pin).into());
        }
        self.gpio.set_level(pin, false);

        if !self.timer.is_running() {
            info!("firing scheduler: starting timer");
            self.timer.start()?;
        }

        let slot = FiringSlot {
            pin,
            delay: DELAY_OFF,
            alarm: DELAY_OFF,
            conducting: false,
        };
        let inserted = self.slots.lock(|s| s.borrow_mut().insert(slot));
        match inserted {
            Ok(id) => {
                debug!("firing scheduler: registered GPIO{} as {:?}", pin, id);
                Ok(id)
            }
            Err(_) => {
                warn!("firing scheduler: no free slot for GPIO{}", pin);
                Err(ConfigError::RegistryFull.into())
            }
        }
    }

    /// Remove a dimmer and drive its gate low. Stops the timer when the
    /// last dimmer leaves. Unknown ids are ignored.
    pub fn unregister(&self, id: SlotId) {
        let (removed, now_empty) = self.slots.lock(|s| {
            let mut slots = s.borrow_mut();
            let removed = slots.remove(id);
            (removed, slots.is_empty())
        });
        let Some(slot) = removed else { return };

        self.gpio.set_level(slot.pin, false);
        debug!("firing scheduler: unregistered GPIO{}", slot.pin);

        if now_empty {
            info!("firing scheduler: stopping timer");
            self.timer.stop();
        }
    }

    /// Update the delay used from the next zero-cross on.
    pub fn set_delay(&self, id: SlotId, delay_us: u16) -> bool {
        self.slots.lock(|s| match s.borrow_mut().get_mut(id) {
            Some(slot) => {
                slot.delay = delay_us;
                true
            }
            None => false,
        })
    }

    pub fn state(&self, id: SlotId) -> Option<FiringState> {
        self.slots.lock(|s| {
            s.borrow().get(id).map(|slot| {
                if slot.conducting {
                    FiringState::Conducting
                } else if slot.alarm != DELAY_OFF {
                    FiringState::Waiting { at_us: slot.alarm }
                } else {
                    FiringState::Off
                }
            })
        })
    }

    /// Zero-cross notification, called from the ZC interrupt.
    ///
    /// `delay_until_zero` is the time in µs from this notification to the
    /// real 0 V crossing: positive when the detector fires ahead of it
    /// (e.g. ~200 µs for a RobotDyn module), negative when the notification
    /// arrives after it.
    pub fn on_zero_cross(&self, delay_until_zero: i16) {
        // A failed reset means the timer is not running: nothing to fire.
        if self.timer.set_count(0).is_err() {
            return;
        }

        let next = self.slots.lock(|s| {
            let mut next = DELAY_OFF;
            for slot in s.borrow_mut().values_mut() {
                if slot.delay != 0 {
                    self.gpio.set_level(slot.pin, false);
                    slot.conducting = false;
                    slot.alarm = slot.delay.max(PHASE_DELAY_MIN_US);
                    next = next.min(slot.alarm);
                } else {
                    self.gpio.set_level(slot.pin, true);
                    slot.conducting = true;
                    slot.alarm = DELAY_OFF;
                }
            }
            next
        });

        // Time spent walking the slots (and waiting for the lock) counts.
        let Ok(count) = self.timer.count() else { return };
        let elapsed = count - i64::from(delay_until_zero);

        if elapsed >= 0 {
            if elapsed <= i64::from(next) {
                if self.timer.set_count(elapsed).is_ok() {
                    self.on_alarm();
                }
            } else {
                // Too late for the earliest gate. Firing now would produce
                // an asymmetric half-wave (visible flicker): skip it.
                let _ = self.timer.set_alarm(None);
                self.slots.lock(|s| {
                    for slot in s.borrow_mut().values_mut() {
                        slot.alarm = DELAY_OFF;
                    }
                });
            }
        } else if self.timer.set_count(elapsed).is_ok() {
            // Real zero still ahead: the counter runs up through 0.
            let alarm = (next != DELAY_OFF).then_some(i64::from(next));
            let _ = self.timer.set_alarm(alarm);
        }
    }

    /// Timer alarm, called from the timer interrupt.
    ///
    /// Fires every due gate, then re-reads the counter and repeats while
    /// the next pending gate is already due, so near-simultaneous firings
    /// are never lost to alarm latency.
    pub fn on_alarm(&self) {
        let Ok(mut now) = self.timer.count() else { return };

        loop {
            let next = self.slots.lock(|s| {
                let mut next = DELAY_OFF;
                for slot in s.borrow_mut().values_mut() {
                    if slot.alarm == DELAY_OFF {
                        continue;
                    }
                    if i64::from(slot.alarm) <= now {
                        self.gpio.set_level(slot.pin, true);
                        slot.conducting = true;
                        slot.alarm = DELAY_OFF;
                    } else {
                        next = next.min(slot.alarm);
                    }
                }
                next
            });

            now = match self.timer.count() {
                Ok(c) => c,
                Err(_) => return,
            };

            if next == DELAY_OFF {
                let _ = self.timer.set_alarm(None);
                return;
            }
            if i64::from(next) > now {
                let _ = self.timer.set_alarm(Some(i64::from(next)));
                return;
            }
        }
    }
}
