//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements           | Connects to                 |
//! |----------------|----------------------|-----------------------------|
//! | `channel_sink` | ControlSink          | LED / display / telemetry channels |
//! | `mqtt`         | PublishPort          | ESP-IDF MQTT client (target only) |
//! | `nvs`          | ConfigPort           | NVS / in-memory store       |
//! |                | StoragePort          |                             |
//! | `time`         | TimePort, DelayNs    | ESP32 system timer          |
//! | `wifi`         | -                    | ESP-IDF WiFi STA            |

pub mod channel_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod nvs;
pub mod time;
pub(super) mod utils;
pub mod wifi;
