//! PWM back-end for voltage regulators driven by a 0-10 V PWM converter.
//!
//! The channel is any `embedded_hal::pwm::SetDutyCycle` (an ESP-IDF LEDC
//! channel on target, a recording mock in tests). Frequency and resolution
//! are properties of the channel; they are carried here for telemetry.

use embedded_hal::pwm::SetDutyCycle;
use log::{error, info};

use crate::config::DimmerConfig;
use crate::error::{ConfigError, HardwareError, Result};
use crate::pins;
use crate::telemetry::DriverInfo;

use super::{Driver, FireCommand};

pub struct PwmDriver<P> {
    pwm: P,
    pin: i32,
    frequency_hz: u32,
    resolution_bits: u8,
}

impl<P: SetDutyCycle> PwmDriver<P> {
    pub fn new(pwm: P, pin: i32) -> Self {
        let defaults = DimmerConfig::default();
        Self {
            pwm,
            pin,
            frequency_hz: defaults.pwm_frequency_hz,
            resolution_bits: defaults.pwm_resolution_bits,
        }
    }

    pub fn with_timing(mut self, frequency_hz: u32, resolution_bits: u8) -> Self {
        self.frequency_hz = frequency_hz;
        self.resolution_bits = resolution_bits;
        self
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn channel(&self) -> &P {
        &self.pwm
    }

    pub fn channel_mut(&mut self) -> &mut P {
        &mut self.pwm
    }

    fn write(&mut self, duty: u16) -> bool {
        match self.pwm.set_duty_cycle(duty) {
            Ok(()) => true,
            Err(_) => {
                error!("pwm: duty write failed on GPIO{}", self.pin);
                false
            }
        }
    }
}

impl<P: SetDutyCycle> Driver for PwmDriver<P> {
    fn kind(&self) -> &'static str {
        "pwm"
    }

    fn configure(&mut self, config: &DimmerConfig) {
        if config.pin != pins::GPIO_NUM_NC {
            self.pin = config.pin;
        }
        self.frequency_hz = config.pwm_frequency_hz;
        self.resolution_bits = config.pwm_resolution_bits;
    }

    fn begin(&mut self) -> Result<()> {
        if !pins::is_valid_output(self.pin) {
            error!("pwm: invalid pin GPIO{}", self.pin);
            return Err(ConfigError::InvalidPin(self.pin).into());
        }
        if self.pwm.set_duty_cycle_fully_off().is_err() {
            error!("pwm: failed to attach GPIO{}", self.pin);
            return Err(HardwareError::PwmWriteFailed.into());
        }
        info!(
            "pwm: GPIO{} at {} Hz, {} bits",
            self.pin, self.frequency_hz, self.resolution_bits
        );
        Ok(())
    }

    fn end(&mut self) {
        let _ = self.pwm.set_duty_cycle_fully_off();
    }

    fn apply(&mut self, cmd: &FireCommand) -> bool {
        if !cmd.online {
            return self.write(0);
        }
        let max = self.pwm.max_duty_cycle();
        let duty = (cmd.fire * f32::from(max)) as u16;
        self.write(duty.min(max))
    }

    fn describe(&self, info: &mut DriverInfo) {
        info.pin = Some(self.pin);
        info.frequency_hz = Some(self.frequency_hz);
        info.resolution_bits = Some(self.resolution_bits);
    }
}
