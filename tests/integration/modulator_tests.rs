//! Burst-fire dimmers on a shared cycle-stealing modulator.

use acdimmer::dimmer::{CycleStealingDriver, Dimmer};
use acdimmer::drivers::gpio::SimGpio;
use acdimmer::drivers::hw_timer::SimTimer;
use acdimmer::ports::HwTimer;
use acdimmer::{CycleStealingModulator, Metrics, SemiPeriod};

type Modulator = CycleStealingModulator<SimGpio, SimTimer>;

fn ssr<'a>(m: &'a Modulator, pin: i32, grid: &SemiPeriod) -> Dimmer<CycleStealingDriver<'a, SimGpio, SimTimer>> {
    let mut d = Dimmer::new(CycleStealingDriver::new(m, pin), grid.clone());
    d.begin().unwrap();
    d.set_online(true);
    d
}

#[test]
fn delivered_energy_tracks_duty_cycle() {
    let m = Modulator::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(10_000);
    let mut a = ssr(&m, 4, &grid);
    let mut b = ssr(&m, 5, &grid);
    a.set_duty_cycle(0.3);
    b.set_duty_cycle(0.8);
    assert_eq!(m.timer().periodic_alarm(), Some(10_000));

    let (mut on_a, mut on_b) = (0u32, 0u32);
    let mut balance_a = 0i32;
    let mut positive = false;
    for _ in 0..1_000 {
        m.on_alarm();
        positive = !positive;
        let polarity = if positive { 1 } else { -1 };
        if m.gpio().level(4) {
            on_a += 1;
            balance_a += polarity;
        }
        if m.gpio().level(5) {
            on_b += 1;
        }
        assert!(balance_a.abs() <= 1, "DC bias on GPIO4: {balance_a}");
    }
    assert!((on_a as f32 / 1_000.0 - 0.3).abs() < 0.01, "{on_a}");
    assert!((on_b as f32 / 1_000.0 - 0.8).abs() < 0.01, "{on_b}");
}

#[test]
fn unknown_semi_period_idles_the_alarm() {
    let m = Modulator::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(10_000);
    let mut d = ssr(&m, 4, &grid);
    d.set_duty_cycle(0.5);
    assert_eq!(m.alarm_period(), Some(10_000));

    d.set_semi_period(0);
    assert_eq!(m.alarm_period(), None);
    assert_eq!(m.timer().periodic_alarm(), None);

    d.set_semi_period(8_333);
    assert_eq!(m.timer().periodic_alarm(), Some(8_333));
}

#[test]
fn burst_fire_metrics_use_resistive_model() {
    let m = Modulator::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(10_000);
    let mut d = ssr(&m, 4, &grid);
    d.set_duty_cycle(0.5);

    let mut metrics = Metrics::default();
    assert!(d.calculate_metrics(&mut metrics, 230.0, 52.9));
    assert!((metrics.power - 500.0).abs() < 0.5);

    let snap = d.snapshot();
    assert_eq!(snap.kind, "cycle_stealing");
    assert_eq!(snap.harmonics.get(&"H1"), Some(&100.0));
    assert_eq!(snap.harmonics.get(&"H3"), Some(&0.0));
}

#[test]
fn ending_last_dimmer_releases_timer_and_pin() {
    let m = Modulator::new(SimGpio::new(), SimTimer::new());
    let grid = SemiPeriod::new(10_000);
    let mut d = ssr(&m, 4, &grid);
    d.on();
    m.on_alarm();
    assert!(m.gpio().level(4));

    d.end();
    assert!(!m.gpio().level(4));
    assert!(!m.timer().is_running());
    assert!(m.is_empty());

    // Restart re-arms the alarm from scratch.
    d.begin().unwrap();
    d.set_online(true);
    assert_eq!(m.timer().periodic_alarm(), Some(10_000));
}
