//! Peripheral back-ends implementing the [`ports`](crate::ports) traits.

pub mod gpio;
pub mod hw_timer;
