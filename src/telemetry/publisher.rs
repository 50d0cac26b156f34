//! Telemetry publisher: at-least-once delivery over a lossy link.
//!
//! Every event is admitted into the ring buffer before any network call.
//! The ring mutex is never held across [`PublishPort::publish`]; after the
//! call the lock is re-taken and the result is committed only if the entry
//! is still in the state it was read in.
//!
//! Lifecycle of one entry:
//!
//! ```text
//!  admit ──▶ unsent ──publish ok──▶ pending ──ack──▶ removed
//!              ▲                       │
//!              └──── timeout while ────┤ timeout while connected:
//!                    disconnected      └─▶ republish, new delivery id
//! ```
//!
//! `publish`, `flush_backlog`, `sweep_timeouts` and `on_delivered` are
//! driven by the telemetry task alone.  `admit` may be called from any
//! task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, error, info, warn};

use super::ring::{BufferedEntry, Outbound, TelemetryRingBuffer};
use super::{TELEMETRY_BUFFER_CAPACITY, TelemetryEvent};
use crate::app::ports::{Tick, TimePort};
use crate::config::{SystemConfig, Topic};
use crate::error::TelemetryError;
use crate::link::codec;
use crate::link::transport::{DeliveryId, PublishPort, Qos};

/// Delivery timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    /// A pending entry older than this is republished or demoted.
    pub ack_timeout_ms: u32,
    /// Delay between consecutive backlog republishes.
    pub flush_spacing_ms: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

impl PublisherConfig {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            ack_timeout_ms: config.ack_timeout_ms,
            flush_spacing_ms: config.flush_spacing_ms,
        }
    }
}

/// Counters exposed for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub buffered: usize,
    pub pending: usize,
    pub evictions: u32,
}

/// Outcome of one timeout sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Timed-out entries sent again with a new delivery id.
    pub republished: usize,
    /// Timed-out entries returned to the unsent pool.
    pub demoted: usize,
    /// Unsent entries whose retry was accepted by the transport.
    pub retried: usize,
    /// Timed-out entries acknowledged or evicted while their republish was
    /// in flight.
    pub superseded: usize,
}

/// What became of one [`TelemetryPublisher::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sent {
    /// Accepted by the transport and recorded against the entry.
    Accepted,
    /// Refused by the transport; the entry is unsent again.
    Refused,
    /// The entry was acked or evicted while the lock was released.
    Stale,
}

struct Inner<const N: usize> {
    ring: TelemetryRingBuffer<N>,
    evictions: u32,
}

pub struct TelemetryPublisher<const N: usize = TELEMETRY_BUFFER_CAPACITY> {
    inner: Mutex<Inner<N>>,
    connected: AtomicBool,
    topic: Topic,
    config: PublisherConfig,
}

impl<const N: usize> TelemetryPublisher<N> {
    /// Starts disconnected with an empty buffer.
    pub fn new(topic: Topic, config: PublisherConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: TelemetryRingBuffer::new(),
                evictions: 0,
            }),
            connected: AtomicBool::new(false),
            topic,
            config,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Record a connection change; returns the previous value.
    pub fn set_connected(&self, connected: bool) -> bool {
        let was = self.connected.swap(connected, Ordering::AcqRel);
        if was != connected {
            info!(
                "Telemetry: link {}",
                if connected { "connected" } else { "disconnected" }
            );
        }
        was
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Buffer `event` without attempting to send it.
    pub fn admit(&self, event: TelemetryEvent, now: Tick) -> Result<u32, TelemetryError> {
        let mut inner = self.lock()?;
        let admission = inner.ring.push(event, now);
        if let Some(old) = admission.evicted {
            inner.evictions = inner.evictions.wrapping_add(1);
            warn!(
                "Telemetry: buffer full, evicted oldest '{}' event (ts={}, pending={})",
                old.event.kind.wire_name(),
                old.event.timestamp,
                old.pending
            );
        }
        Ok(admission.seq)
    }

    /// Buffer `event` and, when connected, publish it immediately.
    /// Returns `true` if the transport accepted the publish.
    pub fn publish<P: PublishPort>(
        &self,
        link: &mut P,
        event: TelemetryEvent,
        now: Tick,
    ) -> Result<bool, TelemetryError> {
        let seq = self.admit(event, now)?;
        if !self.is_connected() {
            debug!("Telemetry: offline, '{}' buffered", event.kind.wire_name());
            return Ok(false);
        }
        let out = Outbound {
            seq,
            event,
            previous_id: None,
        };
        Ok(self.send(link, &out, now)? == Sent::Accepted)
    }

    /// Drop the entry acknowledged under `id`.  Unknown ids are ignored.
    pub fn on_delivered(&self, id: DeliveryId) -> Result<bool, TelemetryError> {
        let removed = self.lock()?.ring.remove_delivered(id);
        match removed {
            Some(entry) => {
                debug!(
                    "Telemetry: delivery {} acknowledged ('{}')",
                    id,
                    entry.event.kind.wire_name()
                );
                Ok(true)
            }
            None => {
                debug!("Telemetry: ack for unknown delivery {} ignored", id);
                Ok(false)
            }
        }
    }

    /// Republish every unsent entry, oldest first, spaced by the configured
    /// delay.  Stops early if the link drops.  Returns how many were
    /// accepted by the transport.
    pub fn flush_backlog<P: PublishPort>(
        &self,
        link: &mut P,
        delay: &mut impl DelayNs,
        clock: &impl TimePort,
    ) -> Result<usize, TelemetryError> {
        let backlog = self.lock()?.ring.unsent();
        if backlog.is_empty() {
            return Ok(0);
        }
        info!("Telemetry: flushing {} buffered events", backlog.len());

        let mut sent = 0;
        for (i, out) in backlog.iter().enumerate() {
            if !self.is_connected() {
                warn!(
                    "Telemetry: link lost during flush, {} events left buffered",
                    backlog.len() - i
                );
                break;
            }
            if i > 0 {
                delay.delay_ms(self.config.flush_spacing_ms);
            }
            if self.send(link, out, clock.now_ms())? == Sent::Accepted {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Handle pending entries whose acknowledgement is overdue.
    ///
    /// Connected: republish them with a fresh delivery id, then retry any
    /// entries whose earlier publish was refused.  Disconnected: demote
    /// them so the next reconnect flush picks them up.
    pub fn sweep_timeouts<P: PublishPort>(
        &self,
        link: &mut P,
        now: Tick,
    ) -> Result<SweepReport, TelemetryError> {
        let timeout = self.config.ack_timeout_ms;
        let mut report = SweepReport::default();

        if !self.is_connected() {
            let mut inner = self.lock()?;
            for out in &inner.ring.expired(now, timeout) {
                if let Some(id) = out.previous_id {
                    if inner.ring.demote(out.seq, id) {
                        report.demoted += 1;
                    }
                }
            }
            if report.demoted > 0 {
                info!(
                    "Telemetry: {} unacknowledged events queued for reconnect",
                    report.demoted
                );
            }
            return Ok(report);
        }

        let (expired, unsent) = {
            let inner = self.lock()?;
            (inner.ring.expired(now, timeout), inner.ring.unsent())
        };

        for out in &expired {
            match self.send(link, out, now)? {
                Sent::Accepted => report.republished += 1,
                Sent::Refused => report.demoted += 1,
                Sent::Stale => report.superseded += 1,
            }
        }
        for out in &unsent {
            if !self.is_connected() {
                break;
            }
            if self.send(link, out, now)? == Sent::Accepted {
                report.retried += 1;
            }
        }

        if report != SweepReport::default() {
            info!(
                "Telemetry: sweep republished={} retried={} demoted={} superseded={}",
                report.republished, report.retried, report.demoted, report.superseded
            );
        }
        Ok(report)
    }

    pub fn stats(&self) -> Result<PublisherStats, TelemetryError> {
        let inner = self.lock()?;
        Ok(PublisherStats {
            buffered: inner.ring.len(),
            pending: inner.ring.pending_count(),
            evictions: inner.evictions,
        })
    }

    /// Copy of the buffer contents, oldest first.
    pub fn entries(&self) -> Result<Vec<BufferedEntry, N>, TelemetryError> {
        Ok(self.lock()?.ring.iter().copied().collect())
    }

    /// Encode and hand one entry to the transport, then commit the result
    /// if the entry is still as it was read.
    fn send<P: PublishPort>(
        &self,
        link: &mut P,
        out: &Outbound,
        now: Tick,
    ) -> Result<Sent, TelemetryError> {
        let payload = match codec::encode_telemetry(&out.event) {
            Ok(p) => p,
            Err(e) => {
                error!("Telemetry: cannot encode '{}': {}", out.event.kind.wire_name(), e);
                return Ok(Sent::Refused);
            }
        };

        match link.publish(&self.topic, &payload, Qos::AtLeastOnce) {
            Ok(id) => {
                let mut inner = self.lock()?;
                let applied = match out.previous_id {
                    None => inner.ring.mark_pending(out.seq, id, now),
                    Some(old) => inner.ring.refresh(out.seq, old, id, now),
                };
                if !applied {
                    debug!("Telemetry: entry {} changed while publishing, id {} unused", out.seq, id);
                    return Ok(Sent::Stale);
                }
                if let Some(old) = out.previous_id {
                    info!("Telemetry: republished delivery {} as {}", old, id);
                }
                Ok(Sent::Accepted)
            }
            Err(e) => {
                warn!("Telemetry: publish failed ({}), event stays buffered", e);
                match out.previous_id {
                    Some(old) if !self.lock()?.ring.demote(out.seq, old) => Ok(Sent::Stale),
                    _ => Ok(Sent::Refused),
                }
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<N>>, TelemetryError> {
        self.inner.lock().map_err(|_| {
            error!("Telemetry: ring buffer lock poisoned");
            TelemetryError::LockPoisoned
        })
    }
}
