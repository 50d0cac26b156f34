//! Fixed-capacity circular store of telemetry awaiting acknowledgement.
//!
//! Entries are kept oldest (tail) to newest (head).  Admission never fails:
//! when full, the oldest entry is evicted first.  Removal by delivery id
//! closes the gap by shifting whichever side of the hole is shorter, so
//! FIFO order of the survivors is preserved.
//!
//! ```text
//!   tail                      head
//!    │                         │
//!    ▼                         ▼
//!  [ e3 | e4 | e5 | e6 | e7 |    |    ]   count = 5
//! ```
//!
//! The buffer itself does no locking; the publisher wraps it in a mutex.

use heapless::Vec;

use super::TelemetryEvent;
use crate::app::ports::Tick;
use crate::link::transport::DeliveryId;

/// A telemetry event plus its delivery bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedEntry {
    pub event: TelemetryEvent,
    /// Admission sequence number, unique for the buffer's lifetime (wraps).
    pub seq: u32,
    /// Id of the in-flight publish, set while `pending`.
    pub delivery_id: Option<DeliveryId>,
    /// A publish has been handed to the transport and not yet acknowledged.
    pub pending: bool,
    pub enqueued_at: Tick,
    /// Tick of the most recent publish attempt.
    pub sent_at: Tick,
}

/// Result of [`TelemetryRingBuffer::push`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    pub seq: u32,
    pub evicted: Option<BufferedEntry>,
}

/// An entry selected for (re)publication, copied out of the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outbound {
    pub seq: u32,
    pub event: TelemetryEvent,
    /// Delivery id of the previous attempt, for pending entries.
    pub previous_id: Option<DeliveryId>,
}

pub struct TelemetryRingBuffer<const N: usize> {
    slots: [Option<BufferedEntry>; N],
    /// Physical index of the oldest entry.
    tail: usize,
    /// Physical index of the next write.
    head: usize,
    count: usize,
    next_seq: u32,
}

impl<const N: usize> Default for TelemetryRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TelemetryRingBuffer<N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "ring buffer capacity must be non-zero") };
        Self {
            slots: [None; N],
            tail: 0,
            head: 0,
            count: 0,
            next_seq: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn pending_count(&self) -> usize {
        self.iter().filter(|e| e.pending).count()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &BufferedEntry> + '_ {
        (0..self.count).filter_map(move |i| self.slots[self.physical(i)].as_ref())
    }

    /// Admit `event` as not-yet-sent, evicting the oldest entry when full.
    pub fn push(&mut self, event: TelemetryEvent, now: Tick) -> Admission {
        let evicted = if self.count == N {
            let old = self.slots[self.tail].take();
            self.tail = (self.tail + 1) % N;
            self.count -= 1;
            old
        } else {
            None
        };

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.slots[self.head] = Some(BufferedEntry {
            event,
            seq,
            delivery_id: None,
            pending: false,
            enqueued_at: now,
            sent_at: now,
        });
        self.head = (self.head + 1) % N;
        self.count += 1;

        Admission { seq, evicted }
    }

    /// Record a successful publish of an unsent entry.  `false` if the entry
    /// is gone or already pending.
    pub fn mark_pending(&mut self, seq: u32, id: DeliveryId, now: Tick) -> bool {
        match self.find_mut(|e| e.seq == seq && !e.pending) {
            Some(entry) => {
                entry.pending = true;
                entry.delivery_id = Some(id);
                entry.sent_at = now;
                true
            }
            None => false,
        }
    }

    /// Replace the delivery id of a pending entry after a republish.
    /// Only applies while the entry still carries `old_id`.
    pub fn refresh(&mut self, seq: u32, old_id: DeliveryId, new_id: DeliveryId, now: Tick) -> bool {
        match self.find_mut(|e| e.seq == seq && e.pending && e.delivery_id == Some(old_id)) {
            Some(entry) => {
                entry.delivery_id = Some(new_id);
                entry.sent_at = now;
                true
            }
            None => false,
        }
    }

    /// Return a pending entry to the unsent pool.  Only applies while the
    /// entry still carries `old_id`.
    pub fn demote(&mut self, seq: u32, old_id: DeliveryId) -> bool {
        match self.find_mut(|e| e.seq == seq && e.pending && e.delivery_id == Some(old_id)) {
            Some(entry) => {
                entry.pending = false;
                entry.delivery_id = None;
                true
            }
            None => false,
        }
    }

    /// Drop the pending entry acknowledged under `id`.  `None` for unknown
    /// or already-removed ids.
    pub fn remove_delivered(&mut self, id: DeliveryId) -> Option<BufferedEntry> {
        let logical = self
            .iter()
            .position(|e| e.pending && e.delivery_id == Some(id))?;
        self.remove_at(logical)
    }

    /// Unsent entries, oldest first.
    pub fn unsent(&self) -> Vec<Outbound, N> {
        self.iter()
            .filter(|e| !e.pending)
            .map(|e| Outbound {
                seq: e.seq,
                event: e.event,
                previous_id: None,
            })
            .collect()
    }

    /// Pending entries whose last send attempt is at least `timeout` ticks
    /// old.  Safe across tick wrap-around.
    pub fn expired(&self, now: Tick, timeout: u32) -> Vec<Outbound, N> {
        self.iter()
            .filter(|e| e.pending && now.wrapping_sub(e.sent_at) >= timeout)
            .map(|e| Outbound {
                seq: e.seq,
                event: e.event,
                previous_id: e.delivery_id,
            })
            .collect()
    }

    /// Remove the entry at logical position `logical` (0 = oldest).
    fn remove_at(&mut self, logical: usize) -> Option<BufferedEntry> {
        if logical >= self.count {
            return None;
        }
        let last = self.count - 1;
        let removed = self.slots[self.physical(logical)].take();

        if logical == 0 {
            self.tail = (self.tail + 1) % N;
        } else if logical == last {
            self.head = (self.head + N - 1) % N;
        } else if logical <= last - logical {
            // Older side is shorter: move it one slot towards the head.
            for i in (0..logical).rev() {
                let moved = self.slots[self.physical(i)].take();
                self.slots[self.physical(i + 1)] = moved;
            }
            self.tail = (self.tail + 1) % N;
        } else {
            // Newer side is shorter: move it one slot towards the tail.
            for i in logical + 1..self.count {
                let moved = self.slots[self.physical(i)].take();
                self.slots[self.physical(i - 1)] = moved;
            }
            self.head = (self.head + N - 1) % N;
        }

        self.count -= 1;
        removed
    }

    fn physical(&self, logical: usize) -> usize {
        (self.tail + logical) % N
    }

    fn find_mut(&mut self, pred: impl Fn(&BufferedEntry) -> bool) -> Option<&mut BufferedEntry> {
        let idx = (0..self.count)
            .map(|i| self.physical(i))
            .find(|&p| self.slots[p].as_ref().is_some_and(&pred))?;
        self.slots[idx].as_mut()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::fsm::SafeState;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Send,
        Ack(u8),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Push),
            2 => Just(Op::Send),
            2 => (0u8..32).prop_map(Op::Ack),
        ]
    }

    proptest! {
        /// Compared against a plain VecDeque model: same survivors, same order.
        #[test]
        fn matches_fifo_model(ops in proptest::collection::vec(arb_op(), 1..200)) {
            let mut ring = TelemetryRingBuffer::<5>::new();
            let mut model: std::collections::VecDeque<(u32, Option<u32>)> = Default::default();
            let mut ts = 0u32;
            let mut next_id = 0u32;

            for op in ops {
                match op {
                    Op::Push => {
                        let adm = ring.push(TelemetryEvent::state_change(ts, SafeState::Locked), 0);
                        if model.len() == 5 {
                            let old = model.pop_front().unwrap();
                            prop_assert_eq!(adm.evicted.map(|e| e.event.timestamp), Some(old.0));
                        } else {
                            prop_assert!(adm.evicted.is_none());
                        }
                        model.push_back((ts, None));
                        ts += 1;
                    }
                    Op::Send => {
                        if let Some(first) = ring.unsent().first().copied() {
                            prop_assert!(ring.mark_pending(first.seq, next_id, 0));
                            let slot = model.iter_mut().find(|m| m.1.is_none()).unwrap();
                            slot.1 = Some(next_id);
                            next_id += 1;
                        }
                    }
                    Op::Ack(id) => {
                        let id = u32::from(id);
                        let removed = ring.remove_delivered(id).is_some();
                        let pos = model.iter().position(|m| m.1 == Some(id));
                        prop_assert_eq!(removed, pos.is_some());
                        if let Some(p) = pos {
                            model.remove(p);
                        }
                    }
                }
                let got: std::vec::Vec<u32> = ring.iter().map(|e| e.event.timestamp).collect();
                let want: std::vec::Vec<u32> = model.iter().map(|m| m.0).collect();
                prop_assert_eq!(got, want);
                prop_assert_eq!(ring.len(), model.len());
            }
        }
    }
}
