//! DFRobot I2C 0-5 V / 0-10 V DAC back-end (DFR1071, DFR1073, DFR0971)
//! for voltage regulators with an analog control input.
//!
//! Register map:
//!
//! | reg    | bytes | meaning                                 |
//! |--------|-------|-----------------------------------------|
//! | `0x01` | 1     | output range: `0x00` 0-5 V, `0x11` 0-10 V |
//! | `0x02` | 2     | channel 0 code, left aligned, LE        |
//! | `0x04` | 2     | channel 1 code, left aligned, LE        |
//! | `0x02` | 4     | both channels                           |

use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::error::{ConfigError, HardwareError, Result};
use crate::telemetry::DriverInfo;

use super::{Driver, FireCommand};

const REG_OUTPUT_RANGE: u8 = 0x01;
const REG_CHANNEL_0: u8 = 0x02;
const REG_CHANNEL_1: u8 = 0x04;

/// Address range selectable with the board's A0..A2 jumpers.
pub const ADDRESS_RANGE: core::ops::RangeInclusive<u8> = 0x58..=0x5F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sku {
    Unknown,
    /// 1 channel, 15 bits.
    Dfr1071Gp8211s,
    /// 2 channels, 15 bits.
    Dfr1073Gp8413,
    /// 2 channels, 12 bits.
    Dfr0971Gp8403,
}

impl Sku {
    /// DAC resolution in bits, 0 when unknown.
    pub const fn resolution_bits(self) -> u8 {
        match self {
            Self::Dfr1071Gp8211s | Self::Dfr1073Gp8413 => 15,
            Self::Dfr0971Gp8403 => 12,
            Self::Unknown => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dfr1071Gp8211s => "DFR1071_GP8211S",
            Self::Dfr1073Gp8413 => "DFR1073_GP8413",
            Self::Dfr0971Gp8403 => "DFR0971_GP8403",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Range0To5V,
    Range0To10V,
}

impl Output {
    const fn register_value(self) -> u8 {
        match self {
            Self::Range0To5V => 0x00,
            Self::Range0To10V => 0x11,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Range0To5V => "0-5V",
            Self::Range0To10V => "0-10V",
        }
    }
}

/// DAC output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Zero,
    One,
    Both,
}

impl Channel {
    const fn index(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Both => 2,
        }
    }
}

pub struct DfRobotDriver<I> {
    i2c: I,
    sku: Sku,
    output: Output,
    /// `None` probes [`ADDRESS_RANGE`] on `begin`.
    address: Option<u8>,
    channel: Channel,
}

impl<I: I2c> DfRobotDriver<I> {
    pub fn new(i2c: I, sku: Sku) -> Self {
        Self {
            i2c,
            sku,
            output: Output::Range0To10V,
            address: None,
            channel: Channel::Zero,
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn sku(&self) -> Sku {
        self.sku
    }

    /// Address in use (after a successful probe).
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    pub fn bus(&self) -> &I {
        &self.i2c
    }

    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    fn probe(&mut self) -> Option<u8> {
        ADDRESS_RANGE.clone().find(|&addr| self.i2c.write(addr, &[]).is_ok())
    }

    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        self.i2c
            .write(address, bytes)
            .map_err(|_| HardwareError::I2cNack.into())
    }

    /// Write a raw DAC code to the configured channel(s).
    fn send_code(&mut self, code: u16) -> bool {
        let bits = self.sku.resolution_bits();
        let (Some(address), 1..) = (self.address, bits) else {
            return false;
        };
        let shift = 16 - u32::from(bits);
        let [lo, hi] = (code << shift).to_le_bytes();
        let result = match self.channel {
            Channel::Zero => self.send(address, &[REG_CHANNEL_0, lo, hi]),
            Channel::One => self.send(address, &[REG_CHANNEL_1, lo, hi]),
            Channel::Both => self.send(address, &[REG_CHANNEL_0, lo, hi, lo, hi]),
        };
        if result.is_err() {
            error!("dfrobot: write to 0x{:02x} failed", address);
        }
        result.is_ok()
    }
}

impl<I: I2c> Driver for DfRobotDriver<I> {
    fn kind(&self) -> &'static str {
        "dfrobot"
    }

    fn begin(&mut self) -> Result<()> {
        if self.sku == Sku::Unknown {
            error!("dfrobot: unknown SKU");
            return Err(ConfigError::UnknownSku.into());
        }

        let address = match self.address {
            Some(addr) => addr,
            None => match self.probe() {
                Some(addr) => addr,
                None => {
                    warn!("dfrobot: no device found on the bus");
                    return Err(HardwareError::I2cNack.into());
                }
            },
        };
        self.address = Some(address);

        self.send(address, &[REG_OUTPUT_RANGE, self.output.register_value()])?;
        info!(
            "dfrobot: {} at 0x{:02x}, channel {}, {}",
            self.sku.name(),
            address,
            self.channel.index(),
            self.output.name()
        );
        Ok(())
    }

    fn end(&mut self) {
        self.send_code(0);
    }

    fn apply(&mut self, cmd: &FireCommand) -> bool {
        if !cmd.online {
            return self.send_code(0);
        }
        let max = (1u32 << self.sku.resolution_bits()) - 1;
        let code = (cmd.fire * max as f32) as u32;
        self.send_code(code.min(max) as u16)
    }

    fn describe(&self, info: &mut DriverInfo) {
        info.sku = Some(self.sku.name());
        info.output = Some(self.output.name());
        info.i2c_address = self.address;
        info.channel = Some(self.channel.index());
        info.resolution_bits = Some(self.sku.resolution_bits());
    }
}
