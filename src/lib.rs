//! AC dimmer library for ESP32-class targets.
//!
//! Turns a requested power level into actuation of TRIACs, random or
//! zero-cross SSRs, and 0-10 V voltage regulators (PWM or I2C DAC).
//! All ESP-IDF-specific code is guarded by the `espidf` feature and
//! `target_os = "espidf"` within each module; everything else runs on the
//! host against the simulated peripherals in [`drivers`].
//!
//! Phase-control dimmers share one [`FiringScheduler`], burst-fire dimmers
//! one [`CycleStealingModulator`]. Both live in `static`s so the zero-cross
//! and timer interrupts can reach them:
//!
//! ```ignore
//! static SCHEDULER: FiringScheduler<EspGpio, GpTimer> =
//!     FiringScheduler::new(EspGpio, GpTimer::new(|| SCHEDULER.on_alarm()));
//!
//! // zero-cross ISR, RobotDyn module (pulse ≈ 400 µs, centred on 0 V)
//! SCHEDULER.on_zero_cross(200);
//!
//! let grid = SemiPeriod::from_frequency(GridFrequency::Hz50);
//! let mut dimmer = Dimmer::new(ThyristorDriver::new(&SCHEDULER, 5), grid);
//! dimmer.begin()?;
//! dimmer.set_online(true);
//! dimmer.set_duty_cycle(0.5);
//! ```

#![deny(unused_must_use)]

pub mod config;
pub mod dimmer;
pub mod drivers;
pub mod error;
pub mod modulator;
pub mod pins;
pub mod ports;
pub mod power;
pub mod registry;
pub mod scheduler;
pub mod telemetry;

pub use config::{DimmerConfig, GridFrequency, SemiPeriod};
pub use dimmer::{Dimmer, Driver, FireCommand};
pub use error::{Error, Result};
pub use modulator::CycleStealingModulator;
pub use power::Metrics;
pub use scheduler::FiringScheduler;
pub use telemetry::DimmerSnapshot;
