//! Hardware-less back-end. Useful to simulate a load, or to run the full
//! duty cycle / metrics chain for a dimmer that is driven by someone else.

use crate::error::Result;

use super::{Driver, FireCommand};

#[derive(Debug, Default)]
pub struct VirtualDriver {
    fire: f32,
    applies: u32,
}

impl VirtualDriver {
    pub const fn new() -> Self {
        Self {
            fire: 0.0,
            applies: 0,
        }
    }

    /// Fire duty cycle of the last apply (0 when it was offline).
    pub fn last_fire(&self) -> f32 {
        self.fire
    }

    pub fn apply_count(&self) -> u32 {
        self.applies
    }
}

impl Driver for VirtualDriver {
    fn kind(&self) -> &'static str {
        "virtual"
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) {
        self.fire = 0.0;
    }

    fn apply(&mut self, cmd: &FireCommand) -> bool {
        self.fire = if cmd.online { cmd.fire } else { 0.0 };
        self.applies += 1;
        true
    }
}
