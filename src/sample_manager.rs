//! Sample registry layered over the LRU cache.
//!
//! The cache owns decoded PCM keyed by path; the registry hands out integer
//! ids, and several ids may point at the same cached path (distinct
//! instances of one file). `get_sample` assembles a self-contained
//! [`SampleDescriptor`] so the render graph never has to look anything up.

use crate::sample_cache::{CacheEntry, SampleCache};
use crate::types::{AudioProperties, PcmData, SampleDescriptor, SampleMetadata};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// One registered instance of a cached sample.
#[derive(Clone, Debug)]
pub struct SampleRegistryEntry {
    pub id: i32,
    pub cache_key: String,
    pub metadata: SampleMetadata,
}

pub struct SampleManager {
    cache: SampleCache,
    registry: RwLock<HashMap<i32, SampleRegistryEntry>>,
    next_id: AtomicI32,
}

impl SampleManager {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: SampleCache::new(cache_capacity),
            registry: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(0),
        }
    }

    /// Caches decoded PCM under `path` without registering an id.
    /// Returns the shared handle to the stored audio.
    pub fn cache_sample(
        &self,
        path: &str,
        data: Vec<f32>,
        metadata: SampleMetadata,
    ) -> Arc<PcmData> {
        self.cache.insert(path, data, properties_of(metadata))
    }

    /// Caches the PCM and registers a fresh id for it.
    pub fn add_sample(&self, path: &str, data: Vec<f32>, metadata: SampleMetadata) -> i32 {
        self.cache.insert(path, data, properties_of(metadata));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.write().unwrap().insert(
            id,
            SampleRegistryEntry {
                id,
                cache_key: path.to_string(),
                metadata,
            },
        );
        debug!(id, path, "registered sample");
        id
    }

    /// Registers another instance of a path that is already cached.
    /// `None` when the path has no cached data.
    pub fn add_sample_instance(&self, path: &str) -> Option<i32> {
        let entry = self.cache.peek(path)?;
        let metadata = SampleMetadata {
            source_sample_rate: entry.properties.sample_rate,
            bit_depth: entry.properties.bit_depth,
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.write().unwrap().insert(
            id,
            SampleRegistryEntry {
                id,
                cache_key: path.to_string(),
                metadata,
            },
        );
        debug!(id, path, "registered sample instance");
        Some(id)
    }

    /// Resolves an id to a playable descriptor, promoting the cached PCM to
    /// most-recent. `None` for unknown ids and for entries whose PCM has
    /// been evicted since registration.
    pub fn get_sample(&self, id: i32) -> Option<SampleDescriptor> {
        let registry = self.registry.read().unwrap();
        let entry = registry.get(&id)?;
        let pcm = self.cache.get(&entry.cache_key)?;
        Some(SampleDescriptor {
            registry_id: entry.id,
            pcm,
            metadata: entry.metadata,
        })
    }

    /// Drops the registry entry and evicts its cache entry. Descriptors
    /// already held by playing voices keep the PCM alive.
    pub fn remove_sample(&self, id: i32) -> bool {
        let mut registry = self.registry.write().unwrap();
        match registry.remove(&id) {
            Some(entry) => {
                self.cache.erase(&entry.cache_key);
                debug!(id, "removed sample");
                true
            }
            None => false,
        }
    }

    /// Reads a cache entry without disturbing the recency order.
    pub fn peek_cache(&self, path: &str) -> Option<CacheEntry> {
        self.cache.peek(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.cache.contains(path)
    }

    pub fn all_sample_ids(&self) -> Vec<i32> {
        let registry = self.registry.read().unwrap();
        let mut ids: Vec<i32> = registry.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }
}

fn properties_of(metadata: SampleMetadata) -> AudioProperties {
    AudioProperties {
        sample_rate: metadata.source_sample_rate,
        bit_depth: metadata.bit_depth,
        num_channels: 2,
    }
}
