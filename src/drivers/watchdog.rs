//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the calling thread to the ESP-IDF TWDT; the device panics
//! and restarts if the control loop stops feeding it for `timeout_ms`.
//! Host builds keep a simulated deadline so starvation is observable.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

#[cfg(not(target_os = "espidf"))]
use std::time::{Duration, Instant};

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    last_feed: std::cell::Cell<Instant>,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the current thread.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self {
                    timeout_ms,
                    subscribed,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}ms timeout", timeout_ms);
            Self {
                timeout_ms,
                last_feed: std::cell::Cell::new(Instant::now()),
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feed the watchdog.  Must be called at least once per timeout.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.last_feed.set(Instant::now());
    }

    /// Whether the simulated deadline has passed since the last feed.
    #[cfg(not(target_os = "espidf"))]
    pub fn is_expired(&self) -> bool {
        self.last_feed.get().elapsed() >= Duration::from_millis(u64::from(self.timeout_ms))
    }
}
