//! ESP32 time adapter.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` (monotonic,
//!   microsecond precision) and `gettimeofday()` for wall-clock stamps.
//! - **`not(target_os = "espidf")`**: uses `std::time` for host-side
//!   testing and simulation.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{Tick, TimePort};

/// Wall-clock values before 2020-01-01 mean SNTP has not synced yet.
const EPOCH_2020: u64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
#[derive(Clone)]
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Unix seconds, or `None` while the wall clock is unsynced.
    #[cfg(target_os = "espidf")]
    fn wall_secs(&self) -> Option<u64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        u64::try_from(tv.tv_sec).ok().filter(|s| *s >= EPOCH_2020)
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_secs(&self) -> Option<u64> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs())
            .filter(|s| *s >= EPOCH_2020)
    }
}

impl TimePort for Esp32TimeAdapter {
    fn now_ms(&self) -> Tick {
        // Truncation is the wrap.
        (self.uptime_us() / 1_000) as Tick
    }

    fn unix_secs(&self) -> u32 {
        self.wall_secs()
            .unwrap_or_else(|| self.uptime_us() / 1_000_000) as u32
    }
}

/// Blocking delay for drivers: FreeRTOS delay on target, thread sleep on
/// the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDelay;

impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::Ets::delay_us(ns.div_ceil(1_000));

        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);

        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn tick_is_monotonic() {
        let t = Esp32TimeAdapter::new();
        let a = t.now_ms();
        SystemDelay.delay_ms(5);
        let b = t.now_ms();
        assert!(b.wrapping_sub(a) >= 5);
    }

    #[test]
    fn host_wall_clock_is_synced() {
        let t = Esp32TimeAdapter::new();
        assert!(u64::from(t.unix_secs()) >= EPOCH_2020);
    }
}
