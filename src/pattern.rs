//! Project data model: step patterns and tracks.
//!
//! These are the persistent, control-thread-owned structures. The render
//! graph copies what it needs at build time and never reads them live.

use serde::{Deserialize, Serialize};

/// Step value marking a silent slot.
pub const REST: i32 = -1;

/// A discrete step sequence plus its musical timing.
///
/// `steps` holds sample ids (`>= 0`) or [`REST`]. `elapsed_ms` and
/// `current_step` are the sequencer's runtime cursors; they are skipped on
/// serialization so the persisted form always starts from step zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepPattern {
    pub steps: Vec<i32>,
    /// How many steps make up one beat, e.g. 4 = 16th notes at 4/4.
    pub steps_per_beat: f32,
    #[serde(skip)]
    pub elapsed_ms: f32,
    #[serde(skip)]
    pub current_step: usize,
}

impl StepPattern {
    pub fn new(steps: Vec<i32>, steps_per_beat: f32) -> Self {
        Self {
            steps,
            steps_per_beat,
            elapsed_ms: 0.0,
            current_step: 0,
        }
    }

    /// Returns the cursors to their pre-playback state.
    pub fn rewind(&mut self) {
        self.elapsed_ms = 0.0;
        self.current_step = 0;
    }
}

impl Default for StepPattern {
    fn default() -> Self {
        Self::new(Vec::new(), 4.0)
    }
}

/// An ordered sequence of patterns with per-track gain and stereo position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: i32,
    pub name: String,
    volume: f32,
    pan: f32,
    pub patterns: Vec<StepPattern>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: -1,
            name: name.into(),
            volume: 1.0,
            pan: 0.0,
            patterns: Vec::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamped to [0, 1].
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Clamped to [-1, 1]; -1 is hard left, +1 hard right.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
    }
}
