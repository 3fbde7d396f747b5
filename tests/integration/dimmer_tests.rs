//! Dimmer front-end against the PWM and I2C DAC back-ends.

use acdimmer::dimmer::dfrobot::Channel;
use acdimmer::dimmer::{DfRobotDriver, Dimmer, Output, PwmDriver, Sku, VirtualDriver};
use acdimmer::error::{ConfigError, Error, HardwareError};
use acdimmer::power::harmonics::phase_control_harmonics;
use acdimmer::power::{MAX_HARMONICS, harmonic_breakdown};
use acdimmer::{DimmerConfig, Metrics, SemiPeriod};

use crate::mock_hw::{MockI2c, MockPwm};

fn pwm_dimmer() -> Dimmer<PwmDriver<MockPwm>> {
    let mut d = Dimmer::new(PwmDriver::new(MockPwm::new(12), 5), SemiPeriod::new(10_000));
    d.begin().unwrap();
    d.set_online(true);
    d
}

#[test]
fn pwm_duty_follows_duty_cycle() {
    let mut d = pwm_dimmer();
    assert!(d.set_duty_cycle(0.5));
    assert_eq!(d.driver().channel().last_duty(), Some(2047));
    assert!(d.on());
    assert_eq!(d.driver().channel().last_duty(), Some(4095));
    assert!(d.off());
    assert_eq!(d.driver().channel().last_duty(), Some(0));
}

#[test]
fn going_offline_writes_off_immediately() {
    let mut d = pwm_dimmer();
    d.set_duty_cycle(0.8);
    let writes = d.driver().channel().duties.len();

    d.set_online(false);
    assert_eq!(d.driver().channel().duties.len(), writes + 1);
    assert_eq!(d.driver().channel().last_duty(), Some(0));
    assert_eq!(d.duty_cycle(), 0.8);

    // Offline: stored, not written.
    assert!(!d.set_duty_cycle(0.3));
    assert_eq!(d.driver().channel().duties.len(), writes + 1);

    d.set_online(true);
    assert_eq!(d.driver().channel().last_duty(), Some((0.3f32 * 4095.0) as u16));
}

#[test]
fn failed_write_reports_false_and_keeps_state() {
    let mut d = pwm_dimmer();
    d.driver_mut().channel_mut().fail_next = true;
    assert!(!d.set_duty_cycle(0.6));
    assert_eq!(d.duty_cycle(), 0.6);
    assert!(d.set_duty_cycle(0.6));
}

#[test]
fn pwm_attach_failure_keeps_dimmer_disabled() {
    let mut pwm = MockPwm::new(12);
    pwm.fail_next = true;
    let mut d = Dimmer::new(PwmDriver::new(pwm, 5), SemiPeriod::default());
    assert_eq!(d.begin(), Err(Error::Hardware(HardwareError::PwmWriteFailed)));
    assert!(!d.is_enabled());
    d.begin().unwrap();
    assert!(d.is_enabled());
}

#[test]
fn limit_and_remap_shape_the_output() {
    let mut d = pwm_dimmer();
    d.configure(&DimmerConfig {
        pin: 5,
        duty_cycle_min: 0.2,
        duty_cycle_max: 0.6,
        duty_cycle_limit: 0.5,
        ..Default::default()
    })
    .unwrap();

    d.set_duty_cycle(1.0);
    assert_eq!(d.duty_cycle(), 0.5);
    assert!((d.duty_cycle_mapped() - 0.4).abs() < 1e-6);
    assert!((d.duty_cycle_fire() - 0.4).abs() < 1e-6);
    assert!(!d.is_on_at_full_power());
}

#[test]
fn pwm_snapshot_reports_timing() {
    let mut d = pwm_dimmer();
    d.configure(&DimmerConfig {
        pin: 5,
        pwm_frequency_hz: 25_000,
        pwm_resolution_bits: 10,
        ..Default::default()
    })
    .unwrap();
    let snap = d.snapshot();
    assert_eq!(snap.kind, "pwm");
    assert_eq!(snap.driver.frequency_hz, Some(25_000));
    assert_eq!(snap.driver.resolution_bits, Some(10));
}

#[test]
fn dfrobot_initialises_range_then_writes_codes() {
    let dac = DfRobotDriver::new(MockI2c::new(0x59), Sku::Dfr0971Gp8403)
        .with_output(Output::Range0To5V)
        .with_channel(Channel::One);
    let mut d = Dimmer::new(dac, SemiPeriod::default());
    d.begin().unwrap();
    d.set_online(true);
    d.set_duty_cycle(1.0);

    let payloads = d.driver().bus().payloads();
    assert_eq!(payloads[0], &[0x01, 0x00]);
    assert_eq!(*payloads.last().unwrap(), &[0x04, 0xF0, 0xFF]);
    assert_eq!(d.driver().address(), Some(0x59));

    d.end();
    assert_eq!(d.driver().bus().last_payload(), Some(&[0x04, 0x00, 0x00][..]));
}

#[test]
fn dfrobot_unknown_sku_is_a_config_error() {
    let mut d = Dimmer::new(
        DfRobotDriver::new(MockI2c::new(0x58), Sku::Unknown),
        SemiPeriod::default(),
    );
    assert_eq!(d.begin(), Err(Error::Config(ConfigError::UnknownSku)));
}

#[test]
fn dfrobot_nack_is_transient() {
    let mut d = Dimmer::new(
        DfRobotDriver::new(MockI2c::new(0x58), Sku::Dfr1071Gp8211s).with_address(0x58),
        SemiPeriod::default(),
    );
    d.begin().unwrap();
    d.set_online(true);
    d.driver_mut().bus_mut().fail_next = true;
    assert!(!d.set_duty_cycle(0.5));
    assert!(d.set_duty_cycle(0.5));

    let snap = d.snapshot();
    assert_eq!(snap.driver.sku, Some("DFR1071_GP8211S"));
    assert_eq!(snap.driver.i2c_address, Some(0x58));
    assert_eq!(snap.driver.resolution_bits, Some(15));
}

#[test]
fn quarter_power_metrics_and_breakdown() {
    let mut d = Dimmer::new(VirtualDriver::new(), SemiPeriod::new(10_000));
    d.begin().unwrap();
    d.set_online(true);
    d.set_duty_cycle(0.25);

    let mut m = Metrics::default();
    assert!(d.calculate_metrics(&mut m, 230.0, 52.9));
    assert!((m.power - 250.0).abs() < 0.1);
    assert_eq!(m.power_factor, Some(0.5));

    let mut h = [0.0f32; MAX_HARMONICS];
    assert!(d.calculate_harmonics(&mut h));
    let parts = harmonic_breakdown(&h, m.current, 52.9, 50.0);
    assert_eq!(parts[0].order, 1);
    assert!(parts[0].current_rms < m.current);
}

#[test]
fn half_power_harmonics_match_closed_form() {
    let mut d = Dimmer::new(VirtualDriver::new(), SemiPeriod::new(10_000));
    d.begin().unwrap();
    d.set_online(true);
    d.set_duty_cycle(0.5);

    let mut h = [0.0f32; MAX_HARMONICS];
    assert!(d.calculate_harmonics(&mut h));
    let mut expected = [0.0f32; MAX_HARMONICS];
    phase_control_harmonics(0.5, &mut expected);
    assert_eq!(h, expected);
    assert!((h[1] - 33.76).abs() < 0.1);

    d.set_duty_cycle(0.8);
    d.calculate_harmonics(&mut h);
    assert!((h[1] - 11.64).abs() < 0.1);
}
