//! Bounded cache of opened dataset handles.
//!
//! The cache holds at most `capacity` entries keyed by [`Name`] and evicts
//! the least-recently-used entry when a new key would exceed capacity.
//!
//! # Layout
//!
//! ```text
//!   index: Name -> slot
//!
//!   slots: [ 0 ][ 1 ][ 2 ] ... [ capacity-1 ]
//!            ▲                      ▲
//!           head (most recent)     tail (least recent)
//!            └──── next ──► ... ──►─┘
//! ```
//!
//! Slots are allocated until the array is full; after that every new key
//! reuses the tail slot, so eviction order is fully deterministic.
//!
//! The cache never opens anything: a miss is a signal to the caller. Two
//! callers that miss on the same name may both open a handle; the last `put`
//! wins and the displaced handle is handed back to the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::name::Name;

/// Default number of open handles kept per provider.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Sentinel for "no slot" in the recency list.
const NIL: usize = usize::MAX;

// =============================================================================
// Slot Array
// =============================================================================

struct Slot<V> {
    name: Name,
    value: V,
    prev: usize,
    next: usize,
}

/// Fixed-capacity slot array with an intrusive recency list.
struct SlotLru<V> {
    slots: Vec<Slot<V>>,
    index: HashMap<Name, usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<V: Clone> SlotLru<V> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.slots[i].prev, self.slots[i].next);

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
    }

    fn push_front(&mut self, i: usize) {
        self.slots[i].prev = NIL;
        self.slots[i].next = self.head;

        if self.head != NIL {
            self.slots[self.head].prev = i;
        }
        self.head = i;

        if self.tail == NIL {
            self.tail = i;
        }
    }

    fn touch(&mut self, i: usize) {
        if self.head != i {
            self.unlink(i);
            self.push_front(i);
        }
    }

    fn get(&mut self, name: &Name) -> Option<V> {
        let i = *self.index.get(name)?;
        self.touch(i);
        Some(self.slots[i].value.clone())
    }

    fn peek(&self, name: &Name) -> Option<V> {
        self.index.get(name).map(|&i| self.slots[i].value.clone())
    }

    /// Insert or refresh; returns the entry displaced by this call, if any.
    fn put(&mut self, name: Name, value: V) -> Option<(Name, V)> {
        if let Some(&i) = self.index.get(&name) {
            let old = std::mem::replace(&mut self.slots[i].value, value);
            self.touch(i);
            return Some((name, old));
        }

        if self.slots.len() < self.capacity {
            let i = self.slots.len();
            self.slots.push(Slot {
                name: name.clone(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.push_front(i);
            self.index.insert(name, i);
            return None;
        }

        // Full: recycle the least-recently-used slot
        let i = self.tail;
        self.unlink(i);
        let evicted = std::mem::replace(
            &mut self.slots[i],
            Slot {
                name: name.clone(),
                value,
                prev: NIL,
                next: NIL,
            },
        );
        self.index.remove(&evicted.name);
        self.index.insert(name, i);
        self.push_front(i);

        Some((evicted.name, evicted.value))
    }

    fn drain(&mut self) -> Vec<(Name, V)> {
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
        self.slots.drain(..).map(|s| (s.name, s.value)).collect()
    }

    /// Names from most to least recently used.
    fn names_by_recency(&self) -> Vec<Name> {
        let mut names = Vec::with_capacity(self.slots.len());
        let mut i = self.head;
        while i != NIL {
            names.push(self.slots[i].name.clone());
            i = self.slots[i].next;
        }
        names
    }
}

// =============================================================================
// ResourceCache
// =============================================================================

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe LRU cache of open handles.
///
/// All operations take a short internal lock; none of them call into
/// backends, so the lock is never held across I/O.
pub struct ResourceCache<V> {
    inner: Mutex<SlotLru<V>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> ResourceCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(SlotLru::new(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotLru<V>> {
        // Every critical section leaves the list consistent before it can panic
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a handle and mark it most recently used.
    pub fn get(&self, name: &Name) -> Option<V> {
        let found = self.lock().get(name);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Look up a handle without touching recency or counters.
    pub fn peek(&self, name: &Name) -> Option<V> {
        self.lock().peek(name)
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.lock().index.contains_key(name)
    }

    /// Insert or refresh an entry.
    ///
    /// Returns the entry this call displaced: either the previous value for
    /// the same name, or the least-recently-used entry evicted to make room.
    /// Releasing the displaced handle is the caller's job.
    pub fn put(&self, name: Name, value: V) -> Option<(Name, V)> {
        let mut inner = self.lock();
        let is_new = !inner.index.contains_key(&name);
        let displaced = inner.put(name, value);
        drop(inner);

        if is_new && displaced.is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        displaced
    }

    /// Remove every entry, returning them so the caller can release them.
    pub fn clear(&self) -> Vec<(Name, V)> {
        self.lock().drain()
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached names ordered from most to least recently used.
    pub fn names_by_recency(&self) -> Vec<Name> {
        self.lock().names_by_recency()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
