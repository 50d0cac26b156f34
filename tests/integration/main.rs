//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! the mock adapters in `mocks`.  All tests run on the host with no real
//! hardware.

mod control_tests;
mod mocks;
mod telemetry_tests;
mod wire_tests;
