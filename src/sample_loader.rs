//! WAV decoding into the engine's PCM format.
//!
//! Decoding always happens on a control thread, ahead of playback. Files
//! land as interleaved stereo f32: mono is duplicated onto both channels,
//! stereo passes through, anything wider is rejected. Int samples
//! (16/24/32-bit) are normalized to [-1, 1].

use crate::error::EngineError;
use crate::sample_manager::SampleManager;
use crate::types::{AudioProperties, SampleMetadata};
use std::path::Path;
use tracing::info;

/// Decoded audio plus everything the registries want to know about it.
pub struct LoadedSample {
    /// Interleaved stereo f32 at the file's native rate.
    pub samples: Vec<f32>,
    pub metadata: SampleMetadata,
    pub properties: AudioProperties,
}

/// Reads and decodes one WAV file.
pub fn load_wav(path: &Path) -> Result<LoadedSample, EngineError> {
    let mut reader =
        hound::WavReader::open(path).map_err(|e| EngineError::DecodeFailed(e.to_string()))?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| EngineError::DecodeFailed(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(|e| EngineError::DecodeFailed(e.to_string()))?
        }
    };

    let samples = match spec.channels {
        1 => raw.iter().flat_map(|&s| [s, s]).collect(),
        2 => raw,
        n => {
            return Err(EngineError::UnsupportedFormat(format!(
                "{n} channels (only mono and stereo are supported)"
            )))
        }
    };

    Ok(LoadedSample {
        samples,
        metadata: SampleMetadata {
            source_sample_rate: spec.sample_rate,
            bit_depth: spec.bits_per_sample as u32,
        },
        properties: AudioProperties {
            sample_rate: spec.sample_rate,
            bit_depth: spec.bits_per_sample as u32,
            num_channels: 2,
        },
    })
}

/// Loads a WAV and registers it with the sample manager under its
/// canonical path. Returns the new registry id.
pub fn register_wav(manager: &SampleManager, path: &Path) -> Result<i32, EngineError> {
    let loaded = load_wav(path)?;
    let key = std::fs::canonicalize(path)?.to_string_lossy().into_owned();
    let id = manager.add_sample(&key, loaded.samples, loaded.metadata);
    info!(id, path = %path.display(), "loaded sample");
    Ok(id)
}
