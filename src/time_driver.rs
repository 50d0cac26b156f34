//! `embassy-time` driver for this firmware.
//!
//! `async_io_mini::Timer`, which bounds every channel wait, schedules its
//! wakeups through `embassy-time`.  Ticks are microseconds:
//! `esp_timer_get_time()` on target, a process-wide `Instant` on host.
//! Pending wakers sit in a deadline list served by one background thread.

use core::task::Waker;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use embassy_time_driver::{Driver, time_driver_impl};
use log::error;

const WAKER_THREAD: &str = "time-driver";
const WAKER_STACK: usize = 3 * 1024;

struct Wakeup {
    at: u64,
    waker: Waker,
}

pub struct ThreadTimeDriver {
    wakeups: Mutex<Vec<Wakeup>>,
    changed: Condvar,
    started: OnceLock<bool>,
}

impl ThreadTimeDriver {
    const fn new() -> Self {
        Self {
            wakeups: Mutex::new(Vec::new()),
            changed: Condvar::new(),
            started: OnceLock::new(),
        }
    }

    fn ensure_thread(&'static self) -> bool {
        *self.started.get_or_init(|| {
            std::thread::Builder::new()
                .name(WAKER_THREAD.into())
                .stack_size(WAKER_STACK)
                .spawn(move || self.serve())
                .map_err(|e| error!("Time driver: waker thread not started: {}", e))
                .is_ok()
        })
    }

    /// Wake everything due, then sleep until the earliest deadline or the
    /// next registration.
    fn serve(&self) {
        let Ok(mut wakeups) = self.wakeups.lock() else {
            error!("Time driver: wakeup list poisoned, timers stopped");
            return;
        };
        loop {
            let now = now_us();
            wakeups.retain(|w| {
                if w.at <= now {
                    w.waker.wake_by_ref();
                    false
                } else {
                    true
                }
            });
            let next = wakeups.iter().map(|w| w.at).min();
            wakeups = match self.wait(wakeups, next.map(|at| at - now)) {
                Some(guard) => guard,
                None => {
                    error!("Time driver: wakeup list poisoned, timers stopped");
                    return;
                }
            };
        }
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, Vec<Wakeup>>,
        timeout_us: Option<u64>,
    ) -> Option<MutexGuard<'a, Vec<Wakeup>>> {
        match timeout_us {
            None => self.changed.wait(guard).ok(),
            Some(us) => self
                .changed
                .wait_timeout(guard, Duration::from_micros(us))
                .ok()
                .map(|(g, _)| g),
        }
    }
}

impl Driver for ThreadTimeDriver {
    fn now(&self) -> u64 {
        now_us()
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        if at <= now_us() || !DRIVER.ensure_thread() {
            waker.wake_by_ref();
            return;
        }
        let Ok(mut wakeups) = self.wakeups.lock() else {
            waker.wake_by_ref();
            return;
        };
        match wakeups.iter_mut().find(|w| w.waker.will_wake(waker)) {
            Some(w) => w.at = w.at.min(at),
            None => wakeups.push(Wakeup {
                at,
                waker: waker.clone(),
            }),
        }
        self.changed.notify_one();
    }
}

time_driver_impl!(static DRIVER: ThreadTimeDriver = ThreadTimeDriver::new());

#[cfg(target_os = "espidf")]
fn now_us() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

#[cfg(not(target_os = "espidf"))]
fn now_us() -> u64 {
    static START: OnceLock<std::time::Instant> = OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_micros() as u64
}
