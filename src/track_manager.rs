//! Thread-safe store of the project's tracks.
//!
//! Tracks are handed out as `Arc<Track>` snapshots and every mutation is
//! copy-on-write: the map swaps in a freshly built `Arc`, so a coordinator
//! holding a snapshot for graph building is never affected by concurrent
//! edits.

use crate::pattern::{StepPattern, Track};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub struct TrackManager {
    tracks: RwLock<HashMap<i32, Arc<Track>>>,
    next_id: AtomicI32,
}

impl TrackManager {
    pub fn new() -> Self {
        Self {
            tracks: RwLock::new(HashMap::new()),
            next_id: AtomicI32::new(0),
        }
    }

    /// Creates an empty track and returns its id.
    pub fn create_track(&self, name: &str) -> i32 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut track = Track::new(name);
        track.id = id;
        self.tracks.write().unwrap().insert(id, Arc::new(track));
        debug!(id, name, "created track");
        id
    }

    pub fn get_track(&self, id: i32) -> Option<Arc<Track>> {
        self.tracks.read().unwrap().get(&id).cloned()
    }

    /// Appends a copy of `pattern` with its runtime cursors rewound.
    pub fn add_pattern_to_track(&self, id: i32, mut pattern: StepPattern) -> bool {
        pattern.rewind();
        self.mutate(id, move |track| track.patterns.push(pattern))
    }

    /// Replaces the track's whole pattern sequence.
    pub fn update_track_patterns(&self, id: i32, mut patterns: Vec<StepPattern>) -> bool {
        for pattern in &mut patterns {
            pattern.rewind();
        }
        self.mutate(id, move |track| track.patterns = patterns)
    }

    pub fn set_track_volume(&self, id: i32, volume: f32) -> bool {
        self.mutate(id, move |track| track.set_volume(volume))
    }

    pub fn set_track_pan(&self, id: i32, pan: f32) -> bool {
        self.mutate(id, move |track| track.set_pan(pan))
    }

    pub fn rename_track(&self, id: i32, name: &str) -> bool {
        let name = name.to_string();
        self.mutate(id, move |track| track.name = name)
    }

    pub fn remove_track(&self, id: i32) -> bool {
        let removed = self.tracks.write().unwrap().remove(&id).is_some();
        if removed {
            debug!(id, "removed track");
        }
        removed
    }

    pub fn all_track_ids(&self) -> Vec<i32> {
        let tracks = self.tracks.read().unwrap();
        let mut ids: Vec<i32> = tracks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Copy-on-write edit: clones the current snapshot, applies `edit`, and
    /// swaps the new `Arc` in. Returns false for unknown ids.
    fn mutate(&self, id: i32, edit: impl FnOnce(&mut Track)) -> bool {
        let mut tracks = self.tracks.write().unwrap();
        let Some(current) = tracks.get(&id) else {
            return false;
        };
        let mut updated = Track::clone(current);
        edit(&mut updated);
        tracks.insert(id, Arc::new(updated));
        true
    }
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new()
    }
}
