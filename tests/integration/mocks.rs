//! Mock adapters for integration tests.
//!
//! Each mock records what it was asked to do so tests can assert on the
//! full history without real radios, flash or GPIO.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use smartsafe::app::events::{DisplayCommand, LedCommand};
use smartsafe::app::ports::{ControlSink, StorageError, StoragePort, Tick, TimePort};
use smartsafe::link::transport::{DeliveryId, PublishError, PublishPort, Qos};
use smartsafe::telemetry::{TelemetryEvent, TelemetryKind};

// ── Publish transport ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub id: DeliveryId,
    pub topic: String,
    pub payload: serde_json::Value,
    pub qos: Qos,
}

/// Transport that hands out increasing delivery ids and records every
/// accepted publish.  `refuse` makes it reject with `Busy`.
#[derive(Default)]
pub struct RecordingLink {
    pub published: Vec<Published>,
    pub refuse: bool,
    next_id: DeliveryId,
}

#[allow(dead_code)]
impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<DeliveryId> {
        self.published.iter().map(|p| p.id).collect()
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.published
            .iter()
            .map(|p| p.payload["ts"].as_u64().unwrap_or(u64::MAX))
            .collect()
    }
}

impl PublishPort for RecordingLink {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: Qos) -> Result<DeliveryId, PublishError> {
        if self.refuse {
            return Err(PublishError::Busy);
        }
        self.next_id += 1;
        self.published.push(Published {
            id: self.next_id,
            topic: topic.to_owned(),
            payload: serde_json::from_slice(payload).expect("publisher emits JSON"),
            qos,
        });
        Ok(self.next_id)
    }
}

// ── NVS ───────────────────────────────────────────────────────

/// In-memory key-value store.  Clones share contents, so a test can keep
/// a handle after moving one into the code under test.
#[derive(Clone, Default)]
pub struct MemNvs {
    data: Rc<RefCell<HashMap<(String, String), Vec<u8>>>>,
    fail_writes: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl MemNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(namespace: &str, key: &str, value: &[u8]) -> Self {
        let nvs = Self::default();
        nvs.data
            .borrow_mut()
            .insert((namespace.into(), key.into()), value.to_vec());
        nvs
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.data
            .borrow()
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned()
    }
}

impl StoragePort for MemNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.data.borrow();
        let value = data
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        let n = value.len().min(buf.len());
        buf[..n].copy_from_slice(&value[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::IoError);
        }
        self.data
            .borrow_mut()
            .insert((namespace.into(), key.into()), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data
            .borrow_mut()
            .remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.get(namespace, key).is_some()
    }
}

// ── Control sink ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub leds: Vec<LedCommand>,
    pub displays: Vec<DisplayCommand>,
    pub telemetry: Vec<TelemetryEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(&self, kind: TelemetryKind) -> Vec<TelemetryEvent> {
        self.telemetry.iter().copied().filter(|e| e.kind == kind).collect()
    }

    pub fn clear(&mut self) {
        self.leds.clear();
        self.displays.clear();
        self.telemetry.clear();
    }
}

impl ControlSink for RecordingSink {
    fn led(&mut self, command: LedCommand) {
        self.leds.push(command);
    }

    fn display(&mut self, command: DisplayCommand) {
        self.displays.push(command);
    }

    fn telemetry(&mut self, event: TelemetryEvent) {
        self.telemetry.push(event);
    }
}

// ── Clock and delay ───────────────────────────────────────────

/// Clock advanced by hand.  Clones share the same tick.
#[derive(Clone)]
pub struct ManualClock {
    tick: Rc<Cell<Tick>>,
    unix: u32,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(start: Tick) -> Self {
        Self {
            tick: Rc::new(Cell::new(start)),
            unix: 1_700_000_000,
        }
    }

    pub fn set(&self, tick: Tick) {
        self.tick.set(tick);
    }

    pub fn advance(&self, ms: u32) {
        self.tick.set(self.tick.get().wrapping_add(ms));
    }
}

impl TimePort for ManualClock {
    fn now_ms(&self) -> Tick {
        self.tick.get()
    }

    fn unix_secs(&self) -> u32 {
        self.unix
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
