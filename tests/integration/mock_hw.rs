//! Mock peripherals for integration tests.
//!
//! Records every PWM duty and I2C write so tests can assert on the full
//! command history without touching real LEDC / I2C registers. Both mocks
//! can be told to fail their next write.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal::pwm::{self, SetDutyCycle};

// ── PWM channel ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmFault;

impl pwm::Error for PwmFault {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

pub struct MockPwm {
    pub max_duty: u16,
    pub duties: Vec<u16>,
    pub fail_next: bool,
}

#[allow(dead_code)]
impl MockPwm {
    pub fn new(resolution_bits: u8) -> Self {
        Self {
            max_duty: ((1u32 << resolution_bits) - 1) as u16,
            duties: Vec::new(),
            fail_next: false,
        }
    }

    pub fn last_duty(&self) -> Option<u16> {
        self.duties.last().copied()
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = PwmFault;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), PwmFault> {
        if std::mem::take(&mut self.fail_next) {
            return Err(PwmFault);
        }
        self.duties.push(duty);
        Ok(())
    }
}

// ── I2C bus ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nack;

impl embedded_hal::i2c::Error for Nack {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cWrite {
    pub address: u8,
    pub bytes: Vec<u8>,
}

/// Bus with a single device answering at `device`.
pub struct MockI2c {
    pub device: u8,
    pub writes: Vec<I2cWrite>,
    pub fail_next: bool,
}

#[allow(dead_code)]
impl MockI2c {
    pub fn new(device: u8) -> Self {
        Self {
            device,
            writes: Vec::new(),
            fail_next: false,
        }
    }

    /// Non-empty writes (probes excluded).
    pub fn payloads(&self) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|w| !w.bytes.is_empty())
            .map(|w| w.bytes.as_slice())
            .collect()
    }

    pub fn last_payload(&self) -> Option<&[u8]> {
        self.payloads().last().copied()
    }
}

impl ErrorType for MockI2c {
    type Error = Nack;
}

impl I2c for MockI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Nack> {
        if address != self.device || std::mem::take(&mut self.fail_next) {
            return Err(Nack);
        }
        for op in operations {
            if let Operation::Write(bytes) = op {
                self.writes.push(I2cWrite {
                    address,
                    bytes: bytes.to_vec(),
                });
            }
        }
        Ok(())
    }
}
