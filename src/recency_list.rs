//! The coupled recency list and associative index.
//!
//! Not thread-safe: every operation here assumes exclusive access, which
//! the [`crate::engine`] module provides by holding the cache lock across
//! every call. The central invariant is the index ↔ list bijection: every
//! key in `index` maps to exactly one live arena slot, and every live slot's
//! key is in `index`.
//!
//! Nodes live in an arena (`Vec<Option<Entry<K, V>>>`) addressed by stable
//! [`Handle`]s rather than as a pointer-linked list, so the whole structure
//! stays safe-Rust: no raw pointers, no unsafe aliasing to reason about.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::entry::{Entry, Handle};

/// The recency list's contents, handed back whole by [`RecencyList::clear`]
/// so destruction of the evicted values can happen off the caller's lock.
pub(crate) struct RecencyListContents<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
}

/// A doubly-linked recency list paired with a key → handle index.
///
/// Head is most-recently-used, tail is least-recently-used. Every public
/// operation is O(1).
pub(crate) struct RecencyList<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
    total_count: usize,
    total_cost: u64,
}

impl<K, V> RecencyList<K, V>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            total_count: 0,
            total_cost: 0,
        }
    }

    pub(crate) fn total_count(&self) -> usize {
        self.total_count
    }

    pub(crate) fn total_cost(&self) -> u64 {
        self.total_cost
    }

    pub(crate) fn handle_for(&self, key: &K) -> Option<Handle> {
        self.index.get(key).copied()
    }

    pub(crate) fn get_value(&self, handle: Handle) -> &V {
        &self.slot(handle).value
    }

    pub(crate) fn tail_handle(&self) -> Option<Handle> {
        self.tail
    }

    pub(crate) fn key_of(&self, handle: Handle) -> &K {
        &self.slot(handle).key
    }

    fn slot(&self, handle: Handle) -> &Entry<K, V> {
        self.slots[handle.0]
            .as_ref()
            .expect("handle must reference a live slot")
    }

    fn slot_mut(&mut self, handle: Handle) -> &mut Entry<K, V> {
        self.slots[handle.0]
            .as_mut()
            .expect("handle must reference a live slot")
    }

    /// Inserts a brand-new node at the head. The key must not already be
    /// present; callers route existing keys through [`Self::bring_to_head`]
    /// plus an in-place value/cost/timestamp update instead.
    pub(crate) fn insert_at_head(&mut self, key: K, value: V, cost: u64, now: Instant) -> Handle {
        debug_assert!(
            !self.index.contains_key(&key),
            "insert_at_head called with a key already present"
        );

        let entry = Entry::new(key.clone(), value, cost, now);
        let handle = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(entry);
                Handle(idx)
            }
            None => {
                self.slots.push(Some(entry));
                Handle(self.slots.len() - 1)
            }
        };

        self.link_at_head(handle);
        self.index.insert(key, handle);
        self.total_count += 1;
        self.total_cost += cost;
        handle
    }

    /// Moves an already-linked node to the head. No-op if already there.
    pub(crate) fn bring_to_head(&mut self, handle: Handle) {
        if self.head == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.link_at_head(handle);
    }

    /// Updates value, cost, and timestamp for an already-present key, and
    /// moves it to the head. Returns the prior cost so the caller can
    /// adjust `totalCost` by the delta rather than re-summing.
    pub(crate) fn touch(&mut self, handle: Handle, value: V, cost: u64, now: Instant) -> u64 {
        self.bring_to_head(handle);
        let entry = self.slot_mut(handle);
        let old_cost = entry.cost;
        entry.value = value;
        entry.cost = cost;
        entry.last_access = now;
        self.total_cost = self.total_cost - old_cost + cost;
        old_cost
    }

    /// Refreshes only the timestamp and recency position for a read.
    pub(crate) fn mark_read(&mut self, handle: Handle, now: Instant) {
        self.bring_to_head(handle);
        self.slot_mut(handle).last_access = now;
    }

    /// Unlinks and removes a node, returning its owned value so the caller
    /// can route it to the release path instead of dropping it here.
    pub(crate) fn remove(&mut self, handle: Handle) -> V {
        self.unlink(handle);
        let entry = self.slots[handle.0].take().expect("double-remove of handle");
        self.index.remove(&entry.key);
        self.free.push(handle.0);
        self.total_count -= 1;
        self.total_cost -= entry.cost;
        entry.value
    }

    /// Removes and returns the tail (least-recently-used) entry's key and
    /// value, or `None` if the list is empty.
    pub(crate) fn pop_tail(&mut self) -> Option<(K, V)> {
        let handle = self.tail?;
        let key = self.slot(handle).key.clone();
        let value = self.remove(handle);
        Some((key, value))
    }

    /// Peeks the tail's last-access timestamp without removing it.
    pub(crate) fn tail_last_access(&self) -> Option<Instant> {
        self.tail.map(|h| self.slot(h).last_access)
    }

    /// Empties the list in O(1), handing the previous contents back to the
    /// caller for deferred destruction.
    pub(crate) fn clear(&mut self) -> RecencyListContents<K, V> {
        let old_slots = std::mem::take(&mut self.slots);
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.total_count = 0;
        self.total_cost = 0;
        RecencyListContents { slots: old_slots }
    }

    fn link_at_head(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let entry = self.slot_mut(handle);
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(old_head) = old_head {
            self.slot_mut(old_head).prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }

    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let entry = self.slot(handle);
            (entry.prev, entry.next)
        };
        match prev {
            Some(prev) => self.slot_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slot_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    /// Checks the structural invariants documented in the data model.
    /// Intended for tests and debug assertions, not the hot path.
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.total_count, self.index.len());
        let mut seen = std::collections::HashSet::new();
        let mut count = 0usize;
        let mut cost = 0u64;
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(handle) = cursor {
            assert!(seen.insert(handle.0), "node visited twice: {:?}", handle);
            let entry = self.slot(handle);
            assert_eq!(entry.prev, prev, "prev link mismatch at {:?}", handle);
            assert_eq!(
                self.index.get(&entry.key).copied(),
                Some(handle),
                "index/list mismatch for key at {:?}",
                handle
            );
            count += 1;
            cost += entry.cost;
            prev = Some(handle);
            cursor = entry.next;
        }
        assert_eq!(prev, self.tail, "tail mismatch");
        assert_eq!(count, self.total_count);
        assert_eq!(cost, self.total_cost);
        if self.total_count == 0 {
            assert!(self.head.is_none() && self.tail.is_none());
        }
    }
}

impl<K, V> Default for RecencyList<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "recency_list_tests.rs"]
mod tests;
