//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Every knob the playback core recognizes, with its default.
///
/// A `cache_capacity` of zero means the sample cache is unbounded.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub buffer_frames: u32,
    /// Fixed at 2 in the current core; the render graph is stereo-only.
    pub output_channels: u32,
    pub cache_capacity: usize,
    pub sample_unit_pool_size: usize,
    pub buffer_pool_size: usize,
    pub buffer_pool_buffer_size: usize,
    pub waveform_queue_capacity: usize,
    pub initial_bpm: f32,
    pub initial_is_looping: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_frames: 512,
            output_channels: 2,
            cache_capacity: 64,
            sample_unit_pool_size: 128,
            buffer_pool_size: 128,
            buffer_pool_buffer_size: 1024,
            waveform_queue_capacity: 64,
            initial_bpm: 120.0,
            initial_is_looping: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AudioSettings::default();
        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.buffer_frames, 512);
        assert_eq!(settings.output_channels, 2);
        assert_eq!(settings.sample_unit_pool_size, 128);
        assert_eq!(settings.waveform_queue_capacity, 64);
        assert!(!settings.initial_is_looping);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let settings: AudioSettings =
            serde_json::from_str(r#"{"sample_rate": 48000, "initial_bpm": 90.0}"#).unwrap();
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.initial_bpm, 90.0);
        assert_eq!(settings.buffer_frames, 512);
    }
}
