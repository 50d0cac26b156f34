//! Per-thread loops.
//!
//! Every task is a plain loop over its inbound channel.  Each module
//! exposes a single-iteration `step` so the loops can be driven by hand in
//! tests; `run` just repeats it.
//!
//! | Task      | Core | Priority | Waits on                    |
//! |-----------|------|----------|-----------------------------|
//! | keypad    | App  | 6        | 20 ms scan period           |
//! | motion    | App  | 5        | 20 ms sample period         |
//! | control   | App  | 4        | key / motion / command      |
//! | led       | App  | 3        | led channel, 20 ms          |
//! | display   | App  | 2        | display channel, 100 ms     |
//! | telemetry | Pro  | 1        | telemetry channel, 100 ms   |
//! | wifi      | Pro  | 1        | link check / backoff        |

pub mod control;
pub mod display;
pub mod input;
pub mod led;
pub mod network;
pub mod telemetry;

use std::io;
use std::thread::JoinHandle;

use log::{error, info};

use crate::drivers::task_pin::{Core, TaskSpec, spawn_on_core};
use crate::error::Result;

pub const KEYPAD_TASK: TaskSpec = TaskSpec {
    name: "keypad\0",
    core: Core::App,
    priority: 6,
    stack_kb: 4,
};

pub const MOTION_TASK: TaskSpec = TaskSpec {
    name: "motion\0",
    core: Core::App,
    priority: 5,
    stack_kb: 4,
};

pub const CONTROL_TASK: TaskSpec = TaskSpec {
    name: "control\0",
    core: Core::App,
    priority: 4,
    stack_kb: 8,
};

pub const LED_TASK: TaskSpec = TaskSpec {
    name: "led\0",
    core: Core::App,
    priority: 3,
    stack_kb: 3,
};

pub const DISPLAY_TASK: TaskSpec = TaskSpec {
    name: "display\0",
    core: Core::App,
    priority: 2,
    stack_kb: 4,
};

pub const TELEMETRY_TASK: TaskSpec = TaskSpec {
    name: "telemetry\0",
    core: Core::Pro,
    priority: 1,
    stack_kb: 8,
};

pub const WIFI_TASK: TaskSpec = TaskSpec {
    name: "wifi\0",
    core: Core::Pro,
    priority: 1,
    stack_kb: 4,
};

pub const MQTT_RX_TASK: TaskSpec = TaskSpec {
    name: "mqtt-rx\0",
    core: Core::Pro,
    priority: 1,
    stack_kb: 6,
};

/// Spawn `body` on its own thread.  An error ends that thread only; it is
/// logged and the rest of the firmware keeps running.
pub fn spawn_task<F>(spec: TaskSpec, body: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    spawn_on_core(spec, move || {
        let name = spec.name.trim_end_matches('\0');
        match body() {
            Ok(()) => info!("{} task finished", name),
            Err(e) => error!("{} task halted: {}", name, e),
        }
    })
}
