//! Hardware timer back-ends for the firing schedulers.
//!
//! On ESP-IDF the timer is a 1 MHz `gptimer` whose alarm callback runs in
//! interrupt context. On simulation targets [`SimTimer`] is a manually
//! advanced counter: tests move time forward with [`SimTimer::advance`] and
//! deliver the alarm themselves.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use crate::error::TimerError;
use crate::ports::HwTimer;

const NO_ALARM: i64 = i64::MIN;

// ───────────────────────────────────────────────────────────────
// Simulation timer
// ───────────────────────────────────────────────────────────────

/// In-memory timer. Time only moves when [`advance`](Self::advance) is
/// called, which makes interrupt latency fully deterministic in tests.
#[derive(Debug)]
pub struct SimTimer {
    running: AtomicBool,
    count: AtomicI64,
    alarm: AtomicI64,
    period: AtomicU32,
    starts: AtomicU32,
    fail_start: AtomicBool,
}

impl SimTimer {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            count: AtomicI64::new(0),
            alarm: AtomicI64::new(NO_ALARM),
            period: AtomicU32::new(0),
            starts: AtomicU32::new(0),
            fail_start: AtomicBool::new(false),
        }
    }

    /// Move the counter forward by `us` microseconds.
    pub fn advance(&self, us: i64) {
        self.count.fetch_add(us, Ordering::AcqRel);
    }

    /// Currently armed one-shot alarm.
    pub fn alarm(&self) -> Option<i64> {
        match self.alarm.load(Ordering::Acquire) {
            NO_ALARM => None,
            at => Some(at),
        }
    }

    /// Currently armed periodic alarm.
    pub fn periodic_alarm(&self) -> Option<u32> {
        match self.period.load(Ordering::Acquire) {
            0 => None,
            p => Some(p),
        }
    }

    /// How many times the timer has been allocated.
    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Acquire)
    }

    /// Make the next `start()` fail as if no timer was left.
    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::Release);
    }

    fn ensure_running(&self) -> Result<(), TimerError> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TimerError::NotRunning)
        }
    }
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl HwTimer for SimTimer {
    fn start(&self) -> Result<(), TimerError> {
        if self.fail_start.swap(false, Ordering::AcqRel) {
            return Err(TimerError::Allocation);
        }
        self.count.store(0, Ordering::Release);
        self.starts.fetch_add(1, Ordering::AcqRel);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.alarm.store(NO_ALARM, Ordering::Release);
        self.period.store(0, Ordering::Release);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn count(&self) -> Result<i64, TimerError> {
        self.ensure_running()?;
        Ok(self.count.load(Ordering::Acquire))
    }

    fn set_count(&self, count: i64) -> Result<(), TimerError> {
        self.ensure_running()?;
        self.count.store(count, Ordering::Release);
        Ok(())
    }

    fn set_alarm(&self, count: Option<i64>) -> Result<(), TimerError> {
        self.ensure_running()?;
        self.alarm.store(count.unwrap_or(NO_ALARM), Ordering::Release);
        Ok(())
    }

    fn set_periodic_alarm(&self, period_us: Option<u32>) -> Result<(), TimerError> {
        self.ensure_running()?;
        self.period.store(period_us.unwrap_or(0), Ordering::Release);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF gptimer
// ───────────────────────────────────────────────────────────────

#[cfg(all(target_os = "espidf", feature = "espidf"))]
pub use esp::GpTimer;

#[cfg(all(target_os = "espidf", feature = "espidf"))]
mod esp {
    use core::ffi::c_void;
    use core::sync::atomic::{AtomicI64, AtomicPtr, Ordering};

    use esp_idf_sys::*;
    use log::{error, info};

    use crate::error::TimerError;
    use crate::ports::HwTimer;

    /// 1 MHz general purpose timer. `on_alarm` is a plain function (usually a
    /// trampoline into a `static` scheduler) invoked from the alarm ISR.
    ///
    /// The raw counter is unsigned. Negative counts are represented by
    /// `bias`: the logical count is `raw + bias`.
    pub struct GpTimer {
        handle: AtomicPtr<gptimer_t>,
        bias: AtomicI64,
        on_alarm: fn(),
    }

    impl GpTimer {
        pub const fn new(on_alarm: fn()) -> Self {
            Self {
                handle: AtomicPtr::new(core::ptr::null_mut()),
                bias: AtomicI64::new(0),
                on_alarm,
            }
        }

        fn handle(&self) -> Result<gptimer_handle_t, TimerError> {
            let h = self.handle.load(Ordering::Acquire);
            if h.is_null() { Err(TimerError::NotRunning) } else { Ok(h) }
        }
    }

    unsafe extern "C" fn alarm_trampoline(
        _timer: gptimer_handle_t,
        _event: *const gptimer_alarm_event_data_t,
        user_ctx: *mut c_void,
    ) -> bool {
        // SAFETY: user_ctx is the `fn()` registered in `start()`.
        let f: fn() = unsafe { core::mem::transmute::<*mut c_void, fn()>(user_ctx) };
        f();
        false
    }

    fn check(rc: esp_err_t) -> Result<(), TimerError> {
        if rc == ESP_OK { Ok(()) } else { Err(TimerError::NotRunning) }
    }

    impl HwTimer for GpTimer {
        fn start(&self) -> Result<(), TimerError> {
            let mut handle: gptimer_handle_t = core::ptr::null_mut();
            // SAFETY: plain ESP-IDF driver calls from task context; the handle
            // is published only after the timer is fully started.
            unsafe {
                let config = gptimer_config_t {
                    clk_src: soc_periph_gptimer_clk_src_t_GPTIMER_CLK_SRC_DEFAULT,
                    direction: gptimer_count_direction_t_GPTIMER_COUNT_UP,
                    resolution_hz: 1_000_000,
                    ..Default::default()
                };
                let rc = gptimer_new_timer(&config, &mut handle);
                if rc != ESP_OK {
                    error!("gptimer: allocation failed (rc={})", rc);
                    return Err(TimerError::Allocation);
                }
                let callbacks = gptimer_event_callbacks_t {
                    on_alarm: Some(alarm_trampoline),
                };
                let ctx = self.on_alarm as *mut c_void;
                if gptimer_register_event_callbacks(handle, &callbacks, ctx) != ESP_OK
                    || gptimer_enable(handle) != ESP_OK
                    || gptimer_start(handle) != ESP_OK
                {
                    gptimer_del_timer(handle);
                    return Err(TimerError::Allocation);
                }
            }
            self.handle.store(handle, Ordering::Release);
            info!("gptimer: started at 1 MHz");
            Ok(())
        }

        fn stop(&self) {
            let h = self.handle.swap(core::ptr::null_mut(), Ordering::AcqRel);
            if h.is_null() {
                return;
            }
            // SAFETY: `h` came from gptimer_new_timer and is no longer shared.
            unsafe {
                gptimer_set_alarm_action(h, core::ptr::null());
                gptimer_stop(h);
                gptimer_disable(h);
                gptimer_del_timer(h);
            }
            info!("gptimer: stopped");
        }

        fn is_running(&self) -> bool {
            !self.handle.load(Ordering::Acquire).is_null()
        }

        fn count(&self) -> Result<i64, TimerError> {
            let h = self.handle()?;
            let mut value: u64 = 0;
            // SAFETY: valid handle; ISR-safe when CONFIG_GPTIMER_ISR_IRAM_SAFE.
            check(unsafe { gptimer_get_raw_count(h, &mut value) })?;
            Ok(value as i64 + self.bias.load(Ordering::Acquire))
        }

        fn set_count(&self, count: i64) -> Result<(), TimerError> {
            let h = self.handle()?;
            let bias = count.min(0);
            self.bias.store(bias, Ordering::Release);
            // SAFETY: as above.
            check(unsafe { gptimer_set_raw_count(h, (count - bias) as u64) })
        }

        fn set_alarm(&self, count: Option<i64>) -> Result<(), TimerError> {
            let h = self.handle()?;
            match count {
                Some(at) => {
                    let cfg = gptimer_alarm_config_t {
                        alarm_count: (at - self.bias.load(Ordering::Acquire)).max(0) as u64,
                        reload_count: 0,
                        ..Default::default()
                    };
                    // SAFETY: cfg outlives the call.
                    check(unsafe { gptimer_set_alarm_action(h, &cfg) })
                }
                // SAFETY: null disarms.
                None => check(unsafe { gptimer_set_alarm_action(h, core::ptr::null()) }),
            }
        }

        fn set_periodic_alarm(&self, period_us: Option<u32>) -> Result<(), TimerError> {
            let h = self.handle()?;
            match period_us {
                Some(period) => {
                    let mut cfg = gptimer_alarm_config_t {
                        alarm_count: u64::from(period),
                        reload_count: 0,
                        ..Default::default()
                    };
                    cfg.flags.set_auto_reload_on_alarm(1);
                    self.bias.store(0, Ordering::Release);
                    // SAFETY: cfg outlives the calls.
                    unsafe {
                        check(gptimer_set_raw_count(h, 0))?;
                        check(gptimer_set_alarm_action(h, &cfg))
                    }
                }
                // SAFETY: null disarms.
                None => check(unsafe { gptimer_set_alarm_action(h, core::ptr::null()) }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_requires_running_timer() {
        let t = SimTimer::new();
        assert_eq!(t.count(), Err(TimerError::NotRunning));
        t.start().unwrap();
        t.advance(250);
        assert_eq!(t.count(), Ok(250));
        t.stop();
        assert!(t.set_count(0).is_err());
    }

    #[test]
    fn start_resets_counter_and_stop_disarms() {
        let t = SimTimer::new();
        t.start().unwrap();
        t.advance(1_000);
        t.set_alarm(Some(42)).unwrap();
        t.set_periodic_alarm(Some(10_000)).unwrap();
        t.stop();
        assert_eq!(t.alarm(), None);
        assert_eq!(t.periodic_alarm(), None);
        t.start().unwrap();
        assert_eq!(t.count(), Ok(0));
        assert_eq!(t.start_count(), 2);
    }

    #[test]
    fn injected_allocation_failure_is_one_shot() {
        let t = SimTimer::new();
        t.fail_next_start();
        assert_eq!(t.start(), Err(TimerError::Allocation));
        assert!(!t.is_running());
        assert!(t.start().is_ok());
    }
}
