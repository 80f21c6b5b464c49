//! Capacity-bounded LRU cache for decoded PCM, keyed by canonical path.
//!
//! # Design
//! - Shared-readers / single-writer lock around the map and recency order
//! - Recency order kept in an arena-backed doubly linked list; each entry
//!   stores its arena index, so a promote is O(1)
//! - Values are `Arc<PcmData>`: eviction drops the cache's reference while
//!   any playing voice keeps the audio alive
//! - Capacity 0 means unbounded
//!
//! Only control threads touch the cache. The audio thread works from
//! pre-resolved descriptors and never takes this lock.

use crate::types::{AudioProperties, PcmData};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const NIL: usize = usize::MAX;

struct OrderNode {
    key: String,
    prev: usize,
    next: usize,
}

/// Doubly linked recency list over a vec arena. Indices are stable handles:
/// a node keeps its slot until removed, so entries can store their position.
struct RecencyOrder {
    nodes: Vec<OrderNode>,
    head: usize,
    tail: usize,
    free: Vec<usize>,
    len: usize,
}

impl RecencyOrder {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
            len: 0,
        }
    }

    fn push_front(&mut self, key: String) -> usize {
        let node = OrderNode {
            key,
            prev: NIL,
            next: self.head,
        };
        let cursor = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        if self.head != NIL {
            self.nodes[self.head].prev = cursor;
        }
        self.head = cursor;
        if self.tail == NIL {
            self.tail = cursor;
        }
        self.len += 1;
        cursor
    }

    fn unlink(&mut self, cursor: usize) {
        let (prev, next) = (self.nodes[cursor].prev, self.nodes[cursor].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[cursor].prev = NIL;
        self.nodes[cursor].next = NIL;
    }

    fn move_to_front(&mut self, cursor: usize) {
        if self.head == cursor {
            return;
        }
        self.unlink(cursor);
        self.nodes[cursor].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = cursor;
        }
        self.head = cursor;
        if self.tail == NIL {
            self.tail = cursor;
        }
    }

    fn remove(&mut self, cursor: usize) -> String {
        self.unlink(cursor);
        self.free.push(cursor);
        self.len -= 1;
        std::mem::take(&mut self.nodes[cursor].key)
    }

    fn back(&self) -> Option<usize> {
        (self.tail != NIL).then_some(self.tail)
    }

    fn key(&self, cursor: usize) -> &str {
        &self.nodes[cursor].key
    }

    fn len(&self) -> usize {
        self.len
    }
}

struct Slot {
    data: Arc<PcmData>,
    properties: AudioProperties,
    cursor: usize,
}

/// What `peek` hands back: the cached audio and its properties, without
/// touching the recency order.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: Arc<PcmData>,
    pub properties: AudioProperties,
}

struct CacheInner {
    capacity: usize,
    map: HashMap<String, Slot>,
    order: RecencyOrder,
}

impl CacheInner {
    fn evict_to_capacity(&mut self) {
        while self.capacity > 0 && self.map.len() > self.capacity {
            let Some(oldest) = self.order.back() else {
                break;
            };
            let key = self.order.remove(oldest);
            self.map.remove(&key);
            tracing::debug!(key = %key, "evicted sample from cache");
        }
    }
}

pub struct SampleCache {
    inner: RwLock<CacheInner>,
}

impl SampleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                capacity,
                map: HashMap::new(),
                order: RecencyOrder::new(),
            }),
        }
    }

    /// Inserts or replaces the entry at `key`, making it most-recent, then
    /// evicts from the cold end until the cache fits its capacity.
    ///
    /// Odd-length input is padded with one trailing zero (stereo frames are
    /// always whole). Returns the shared handle to the stored PCM.
    pub fn insert(&self, key: &str, data: Vec<f32>, properties: AudioProperties) -> Arc<PcmData> {
        let data = Arc::new(PcmData::new(data));
        let mut inner = self.inner.write().unwrap();
        match inner.map.get_mut(key) {
            Some(slot) => {
                slot.data = Arc::clone(&data);
                slot.properties = properties;
                let cursor = slot.cursor;
                inner.order.move_to_front(cursor);
            }
            None => {
                let cursor = inner.order.push_front(key.to_string());
                inner.map.insert(
                    key.to_string(),
                    Slot {
                        data: Arc::clone(&data),
                        properties,
                        cursor,
                    },
                );
            }
        }
        inner.evict_to_capacity();
        data
    }

    /// Returns the PCM handle and promotes the key to most-recent.
    pub fn get(&self, key: &str) -> Option<Arc<PcmData>> {
        let mut inner = self.inner.write().unwrap();
        let slot = inner.map.get(key)?;
        let (data, cursor) = (Arc::clone(&slot.data), slot.cursor);
        inner.order.move_to_front(cursor);
        Some(data)
    }

    /// Returns the full entry without touching the recency order.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        let inner = self.inner.read().unwrap();
        inner.map.get(key).map(|slot| CacheEntry {
            data: Arc::clone(&slot.data),
            properties: slot.properties,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().unwrap().map.contains_key(key)
    }

    pub fn erase(&self, key: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.map.remove(key) {
            Some(slot) => {
                inner.order.remove(slot.cursor);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.map.clear();
        inner.order = RecencyOrder::new();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().unwrap().capacity
    }

    /// Changes the capacity, evicting immediately if the cache is now over.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.write().unwrap();
        inner.capacity = capacity;
        inner.evict_to_capacity();
    }

    /// Least-recently-used key, if any. Exposed for diagnostics.
    pub fn coldest(&self) -> Option<String> {
        let inner = self.inner.read().unwrap();
        inner.order.back().map(|c| inner.order.key(c).to_string())
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props() -> AudioProperties {
        AudioProperties {
            sample_rate: 44100,
            bit_depth: 16,
            num_channels: 2,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = SampleCache::new(4);
        cache.insert("a", vec![0.5, -0.5], props());
        let pcm = cache.get("a").expect("entry should exist");
        assert_eq!(pcm.samples(), &[0.5, -0.5]);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_handed_out_pcm_is_even() {
        let cache = SampleCache::new(4);
        cache.insert("odd", vec![0.1, 0.2, 0.3], props());
        let pcm = cache.get("odd").unwrap();
        assert_eq!(pcm.len() % 2, 0);
    }

    #[test]
    fn test_lru_eviction_order() {
        // Capacity 2: insert a, b; touch a; insert c => b is the coldest and goes.
        let cache = SampleCache::new(2);
        cache.insert("a", vec![0.0; 2], props());
        cache.insert("b", vec![0.0; 2], props());
        cache.get("a");
        cache.insert("c", vec![0.0; 2], props());

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = SampleCache::new(2);
        cache.insert("a", vec![0.0; 2], props());
        cache.insert("b", vec![0.0; 2], props());
        cache.peek("a");
        cache.insert("c", vec![0.0; 2], props());

        // peek must not have rescued "a" from the cold end.
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let cache = SampleCache::new(3);
        for i in 0..20 {
            cache.insert(&format!("s{i}"), vec![0.0; 2], props());
            assert!(cache.len() <= 3);
            assert_eq!(cache.len(), cache.order_len());
        }
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let cache = SampleCache::new(0);
        for i in 0..100 {
            cache.insert(&format!("s{i}"), vec![0.0; 2], props());
        }
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_set_capacity_evicts() {
        let cache = SampleCache::new(0);
        for i in 0..10 {
            cache.insert(&format!("s{i}"), vec![0.0; 2], props());
        }
        cache.set_capacity(4);
        assert_eq!(cache.len(), 4);
        // The survivors are the four most recently inserted.
        for i in 6..10 {
            assert!(cache.contains(&format!("s{i}")));
        }
    }

    #[test]
    fn test_reinsert_replaces_and_promotes() {
        let cache = SampleCache::new(2);
        cache.insert("a", vec![0.1, 0.1], props());
        cache.insert("b", vec![0.2, 0.2], props());
        cache.insert(
            "a",
            vec![0.9, 0.9],
            AudioProperties {
                sample_rate: 48000,
                bit_depth: 24,
                num_channels: 2,
            },
        );

        let entry = cache.peek("a").unwrap();
        assert_eq!(entry.data.samples(), &[0.9, 0.9]);
        assert_eq!(entry.properties.sample_rate, 48000);

        // "a" was promoted, so the next eviction removes "b".
        cache.insert("c", vec![0.3, 0.3], props());
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_evicted_pcm_survives_through_handle() {
        let cache = SampleCache::new(1);
        let held = cache.insert("a", vec![0.5, 0.5], props());
        cache.insert("b", vec![0.0; 2], props());
        assert!(!cache.contains("a"));
        // The handle taken before eviction still reads the audio.
        assert_eq!(held.samples(), &[0.5, 0.5]);
    }

    #[test]
    fn test_erase_and_clear() {
        let cache = SampleCache::new(4);
        cache.insert("a", vec![0.0; 2], props());
        cache.insert("b", vec![0.0; 2], props());
        assert!(cache.erase("a"));
        assert!(!cache.erase("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.order_len(), 0);
    }
}
