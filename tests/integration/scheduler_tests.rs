//! Phase-control dimmers on a shared firing scheduler, driven through
//! full half-cycles with the simulated timer.

use acdimmer::dimmer::{Dimmer, ThyristorDriver};
use acdimmer::drivers::gpio::SimGpio;
use acdimmer::drivers::hw_timer::SimTimer;
use acdimmer::ports::HwTimer;
use acdimmer::scheduler::{FiringScheduler, FiringState, PHASE_DELAY_MIN_US};
use acdimmer::{DimmerConfig, GridFrequency, SemiPeriod};

type Scheduler = FiringScheduler<SimGpio, SimTimer>;

const SEMI: u16 = 10_000;

fn thyristor<'a>(s: &'a Scheduler, pin: i32, grid: &SemiPeriod) -> Dimmer<ThyristorDriver<'a, SimGpio, SimTimer>> {
    let mut d = Dimmer::new(ThyristorDriver::new(s, pin), grid.clone());
    d.begin().unwrap();
    d.set_online(true);
    d
}

/// Deliver every alarm due up to `until` (µs after the counter origin).
fn run_until(s: &Scheduler, until: i64) {
    loop {
        let now = s.timer().count().unwrap();
        match s.timer().alarm() {
            Some(at) if at <= until => {
                s.timer().advance(at - now);
                s.on_alarm();
            }
            _ => {
                s.timer().advance(until - now);
                return;
            }
        }
    }
}

#[test]
fn three_dimmers_fire_at_their_phase() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::from_frequency(GridFrequency::Hz50);
    let mut off = thyristor(&s, 4, &grid);
    let mut half = thyristor(&s, 5, &grid);
    let mut full = thyristor(&s, 6, &grid);

    assert!(off.set_duty_cycle(0.0));
    assert!(half.set_duty_cycle(0.5));
    assert!(full.set_duty_cycle(1.0));

    for _ in 0..3 {
        s.on_zero_cross(0);
        assert!(s.gpio().level(6), "100 % conducts from the zero-cross");
        assert!(!s.gpio().level(5));
        assert!(!s.gpio().level(4));

        run_until(&s, 4_999);
        assert!(!s.gpio().level(5));
        run_until(&s, 5_000);
        assert!(s.gpio().level(5), "50 % fires at semi / 2");

        run_until(&s, i64::from(SEMI) - 1);
        assert!(!s.gpio().level(4), "0 % never fires");
    }
}

#[test]
fn power_lut_half_power_fires_near_half_period() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(SEMI);
    let mut d = thyristor(&s, 5, &grid);
    d.enable_power_lut(true, 0).unwrap();
    d.set_duty_cycle(0.5);

    let delay = d.driver().firing_delay();
    assert!((4_950..=5_050).contains(&delay), "delay = {delay}");

    s.on_zero_cross(0);
    run_until(&s, i64::from(delay) - 1);
    assert!(!s.gpio().level(5));
    run_until(&s, i64::from(delay));
    assert!(s.gpio().level(5));
}

#[test]
fn very_low_power_still_respects_gate_minimum() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(SEMI);
    let mut d = thyristor(&s, 5, &grid);
    d.set_duty_cycle(0.999);

    let slot = d.driver().slot().unwrap();
    s.on_zero_cross(0);
    assert_eq!(
        s.state(slot),
        Some(FiringState::Waiting {
            at_us: PHASE_DELAY_MIN_US
        })
    );
}

#[test]
fn going_offline_stops_firing_from_next_half_cycle() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(SEMI);
    let mut d = thyristor(&s, 5, &grid);
    d.set_duty_cycle(1.0);
    s.on_zero_cross(0);
    assert!(s.gpio().level(5));

    d.set_online(false);
    assert_eq!(d.duty_cycle_fire(), 0.0);
    s.on_zero_cross(0);
    run_until(&s, i64::from(SEMI) - 1);
    assert!(!s.gpio().level(5));

    d.set_online(true);
    s.on_zero_cross(0);
    assert!(s.gpio().level(5));
}

#[test]
fn lifecycle_owns_the_timer() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(SEMI);
    {
        let mut a = thyristor(&s, 4, &grid);
        let _b = thyristor(&s, 5, &grid);
        assert!(s.timer().is_running());
        assert_eq!(s.len(), 2);
        a.end();
        a.end();
        assert_eq!(s.len(), 1);
    }
    // Dropped dimmers unregister themselves.
    assert!(s.is_empty());
    assert!(!s.timer().is_running());

    let mut c = thyristor(&s, 6, &grid);
    assert!(s.timer().is_running());
    c.end();
    assert_eq!(s.timer().start_count(), 2);
}

#[test]
fn invalid_pin_leaves_dimmer_disabled() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let mut d = Dimmer::new(ThyristorDriver::new(&s, 22), SemiPeriod::new(SEMI));
    assert!(d.begin().is_err());
    assert!(!d.is_enabled());
    assert!(!d.set_duty_cycle(0.5));
    assert!(!s.timer().is_running());

    d.configure(&DimmerConfig {
        pin: 7,
        ..Default::default()
    })
    .unwrap();
    d.begin().unwrap();
    assert_eq!(d.driver().pin(), 7);
    assert!(s.gpio().is_output(7));
}

#[test]
fn snapshot_carries_firing_extras() {
    let s = Scheduler::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(SEMI);
    let mut d = thyristor(&s, 5, &grid);
    d.set_duty_cycle(0.25);

    let snap = d.snapshot();
    assert_eq!(snap.kind, "thyristor");
    assert_eq!(snap.driver.pin, Some(5));
    assert_eq!(snap.driver.firing_delay_us, Some(7_500));
    assert_eq!(snap.driver.phase_angle, Some(135.0));

    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains(r#""firing_delay_us":7500"#));
    assert!(json.contains(r#""H21":"#));
}
