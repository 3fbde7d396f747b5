//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated GPIO / timer and the recording mocks in
//! `mock_hw`. All tests run on the host with no real hardware required.

mod dimmer_tests;
mod mock_hw;
mod modulator_tests;
mod scheduler_tests;
