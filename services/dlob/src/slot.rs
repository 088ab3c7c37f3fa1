//! Current-slot tracking
//!
//! The chain slot only moves forward here: updates keep the max of the
//! stored and observed value, so a lagging RPC response can never rewind the
//! clock the book is built against. The scalar sits behind a mutex so health
//! checks read a consistent (slot, received-at) pair.

use std::sync::Mutex;
use std::time::Instant;

/// Monotonic source of the current chain slot.
#[derive(Debug)]
pub struct SlotSource {
    inner: Mutex<SlotState>,
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    last_slot_received: u64,
    received_at: Option<Instant>,
}

impl SlotSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                last_slot_received: 0,
                received_at: None,
            }),
        }
    }

    /// Record an observed slot. Stale (lower) observations are ignored.
    pub fn update(&self, slot: u64) {
        let mut state = self.inner.lock().expect("slot lock poisoned");
        if slot > state.last_slot_received {
            state.last_slot_received = slot;
        }
        state.received_at = Some(Instant::now());
    }

    /// The highest slot seen so far.
    pub fn current_slot(&self) -> u64 {
        self.inner.lock().expect("slot lock poisoned").last_slot_received
    }

    /// Seconds since the last slot observation, if any.
    pub fn seconds_since_last_update(&self) -> Option<u64> {
        let state = self.inner.lock().expect("slot lock poisoned");
        state.received_at.map(|at| at.elapsed().as_secs())
    }
}

impl Default for SlotSource {
    fn default() -> Self {
        Self::new()
    }
}
