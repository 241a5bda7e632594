// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pending-response table.
//!
//! Holds every unresolved response keyed by request ID, plus a min-heap of
//! deadlines for the timer thread. Heap entries are never removed eagerly:
//! when a response resolves early its heap entry goes stale and is skipped
//! the next time the heap head is inspected.

use crate::response::ResponseSlot;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug)]
struct PendingEntry {
    deadline: Instant,
    slot: Arc<ResponseSlot>,
}

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<u64, PendingEntry>,
    deadlines: BinaryHeap<Reverse<(Instant, u64)>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `slot` until `deadline`. Fails if its ID is already pending.
    pub fn insert(&mut self, slot: Arc<ResponseSlot>, deadline: Instant) -> Result<(), u64> {
        let id = slot.id;
        if self.entries.contains_key(&id) {
            return Err(id);
        }
        self.entries.insert(id, PendingEntry { deadline, slot });
        self.deadlines.push(Reverse((deadline, id)));
        Ok(())
    }

    pub fn remove(&mut self, id: u64) -> Option<Arc<ResponseSlot>> {
        self.entries.remove(&id).map(|entry| entry.slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Earliest live deadline.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if self.is_live(deadline, id) {
                return Some(deadline);
            }
            self.deadlines.pop();
        }
        None
    }

    /// Remove and return every entry whose deadline is at or before `now`.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Arc<ResponseSlot>> {
        let mut expired = Vec::new();
        while let Some(Reverse((deadline, id))) = self.deadlines.peek().copied() {
            if deadline > now {
                break;
            }
            self.deadlines.pop();
            if self.is_live(deadline, id) {
                if let Some(slot) = self.remove(id) {
                    expired.push(slot);
                }
            }
        }
        expired
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<Arc<ResponseSlot>> {
        self.deadlines.clear();
        self.entries.drain().map(|(_, entry)| entry.slot).collect()
    }

    fn is_live(&self, deadline: Instant, id: u64) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|entry| entry.deadline == deadline)
    }
}
