//! Core value types shared across the playback engine.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable interleaved stereo PCM (L R L R ...).
///
/// The length is always even so the buffer holds whole stereo frames.
/// Ownership is shared between the sample cache and any live voices, so a
/// playing tail survives cache eviction.
pub struct PcmData {
    samples: Vec<f32>,
}

impl PcmData {
    /// Wraps decoded samples, padding one trailing zero if the input has an
    /// odd length.
    pub fn new(mut samples: Vec<f32>) -> Self {
        if samples.len() % 2 != 0 {
            samples.push(0.0);
        }
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Total interleaved sample count (frames × 2).
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

impl std::fmt::Debug for PcmData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmData")
            .field("len", &self.samples.len())
            .finish()
    }
}

/// Properties of a cached PCM buffer as it entered the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioProperties {
    pub sample_rate: u32,
    pub bit_depth: u32,
    /// Informative only; the renderer treats all PCM as stereo.
    pub num_channels: u32,
}

/// Provenance of a registered sample (the file it was decoded from).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub source_sample_rate: u32,
    pub bit_depth: u32,
}

/// A fully resolved, self-contained reference to one playable sample.
///
/// Cheap to clone; every playing voice holds its own descriptor so the
/// audio thread never has to consult the registry.
#[derive(Clone, Debug)]
pub struct SampleDescriptor {
    pub registry_id: i32,
    pub pcm: Arc<PcmData>,
    pub metadata: SampleMetadata,
}

/// Per-callback playback parameters, snapshotted once by the proxy and
/// passed by value down the whole render tree.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext {
    pub is_looping: bool,
    pub bpm: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            is_looping: false,
            bpm: 120.0,
        }
    }
}
