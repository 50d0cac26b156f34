//! Application core: pure domain logic, zero I/O.
//!
//! PIN handling, tamper detection, remote command dispatch and the
//! control service that ties them to the state machine.  All interaction
//! with hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod motion;
pub mod pin;
pub mod ports;
pub mod processor;
pub mod service;
