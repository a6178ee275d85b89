//! Bounded answer store with LRU recency and TTL expiry.
//!
//! Entries live in a slab of list nodes linked most-recently-used first,
//! indexed by fingerprint. One mutex covers the map and the list so that
//! reorder-on-read, expiry removal and evict-on-write are atomic.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::normalize::Fingerprint;

/// Configuration for the cache store.
#[derive(Debug, Clone)]
pub struct CacheStoreConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Stored answer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    answer: String,
    created_at: Instant,
}

impl CacheEntry {
    fn new(answer: String, created_at: Instant) -> Self {
        Self { answer, created_at }
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Live while strictly younger than `ttl`.
    pub fn is_live(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

#[derive(Debug)]
struct Node {
    key: Fingerprint,
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct LruState {
    index: HashMap<Fingerprint, usize>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
}

impl LruState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(n) => (n.prev, n.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(nx) => {
                if let Some(n) = self.node_mut(nx) {
                    n.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(n) = self.node_mut(idx) {
            n.prev = None;
            n.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(n) = self.node_mut(idx) {
            n.prev = None;
            n.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(n) = self.node_mut(h) {
                n.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn remove(&mut self, idx: usize) -> Option<Node> {
        self.unlink(idx);
        let node = self.nodes.get_mut(idx)?.take()?;
        self.index.remove(&node.key);
        self.free.push(idx);
        Some(node)
    }

    fn insert_front(&mut self, key: Fingerprint, entry: CacheEntry) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(n) = self.node_mut(idx) {
                n.entry = entry;
            }
            self.touch(idx);
            return;
        }

        let node = Node { key, entry, prev: None, next: None };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    fn pop_back(&mut self) -> Option<Node> {
        let tail = self.tail?;
        self.remove(tail)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }
}

/// Thread-safe LRU + TTL answer store.
pub struct CacheStore {
    state: Mutex<LruState>,
    config: CacheStoreConfig,
}

impl CacheStore {
    pub fn new(config: CacheStoreConfig) -> Self {
        let config = CacheStoreConfig {
            capacity: config.capacity.max(1),
            ttl: config.ttl,
        };
        Self {
            state: Mutex::new(LruState::with_capacity(config.capacity)),
            config,
        }
    }

    /// Look up a live entry and mark it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let idx = *state.index.get(key)?;

        let live = state
            .node(idx)
            .map(|n| n.entry.is_live(self.config.ttl, now))
            .unwrap_or(false);

        if !live {
            state.remove(idx);
            tracing::trace!(fingerprint = %key.display_key(), "expired entry dropped on read");
            return None;
        }

        state.touch(idx);
        state.node(idx).map(|n| n.entry.clone())
    }

    /// Check for a live entry without changing recency.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        let now = Instant::now();
        let state = self.state.lock();
        state
            .index
            .get(key)
            .and_then(|&idx| state.node(idx))
            .map(|n| n.entry.is_live(self.config.ttl, now))
            .unwrap_or(false)
    }

    /// Insert or overwrite an answer at the most-recently-used position.
    ///
    /// Returns the number of least-recently-used entries evicted to stay
    /// within capacity.
    pub fn put(&self, key: Fingerprint, answer: impl Into<String>) -> usize {
        let entry = CacheEntry::new(answer.into(), Instant::now());
        let mut state = self.state.lock();
        state.insert_front(key, entry);

        let mut evicted = 0;
        while state.len() > self.config.capacity {
            match state.pop_back() {
                Some(node) => {
                    tracing::trace!(fingerprint = %node.key.display_key(), "evicted lru entry");
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let expired: Vec<usize> = state
            .index
            .values()
            .copied()
            .filter(|&idx| {
                state
                    .node(idx)
                    .map(|n| !n.entry.is_live(self.config.ttl, now))
                    .unwrap_or(false)
            })
            .collect();

        for idx in &expired {
            state.remove(*idx);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    pub fn clear(&self) {
        self.state.lock().clear();
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheStoreConfig::default())
    }
}
