//! A voice: one playing instance of a sample.

use crate::render_node::RenderNode;
use crate::types::{RenderContext, SampleDescriptor};

/// Plays a single [`SampleDescriptor`] from a position cursor measured in
/// interleaved samples.
///
/// Unlike compositional nodes, a voice overwrites the scratch buffer it is
/// handed; the pattern sequencer owns the additive mix. The core is
/// stereo-only, so any other channel count renders silence.
pub struct SampleVoice {
    descriptor: Option<SampleDescriptor>,
    position: usize,
    checked_out: bool,
}

impl SampleVoice {
    /// An unarmed voice, as pre-allocated by the pool.
    pub fn idle() -> Self {
        Self {
            descriptor: None,
            position: 0,
            checked_out: false,
        }
    }

    pub fn new(descriptor: SampleDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            position: 0,
            checked_out: false,
        }
    }

    /// Rearms a recycled voice with new sample data. No allocation; the
    /// descriptor is a couple of words plus an `Arc` bump.
    pub fn reinitialize(&mut self, descriptor: SampleDescriptor) {
        self.descriptor = Some(descriptor);
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn is_checked_out(&self) -> bool {
        self.checked_out
    }

    pub(crate) fn set_checked_out(&mut self, checked_out: bool) {
        self.checked_out = checked_out;
    }
}

impl Default for SampleVoice {
    fn default() -> Self {
        Self::idle()
    }
}

impl RenderNode for SampleVoice {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, _ctx: RenderContext) {
        let span = frames * channels;
        let out = &mut output[..span];

        let Some(descriptor) = self.descriptor.as_ref() else {
            out.fill(0.0);
            return;
        };
        if channels != 2 {
            out.fill(0.0);
            return;
        }

        let samples = descriptor.pcm.samples();
        let remaining = samples.len().saturating_sub(self.position);
        let take = span.min(remaining);

        out[..take].copy_from_slice(&samples[self.position..self.position + take]);
        out[take..].fill(0.0);
        self.position += take;
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn is_finished(&self) -> bool {
        match &self.descriptor {
            Some(descriptor) => self.position >= descriptor.pcm.len(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PcmData, SampleMetadata};
    use std::sync::Arc;

    fn descriptor(samples: Vec<f32>) -> SampleDescriptor {
        SampleDescriptor {
            registry_id: 0,
            pcm: Arc::new(PcmData::new(samples)),
            metadata: SampleMetadata {
                source_sample_rate: 44100,
                bit_depth: 16,
            },
        }
    }

    #[test]
    fn test_copies_then_zero_fills_tail() {
        let mut voice = SampleVoice::new(descriptor(vec![0.5, -0.5, 0.5, -0.5]));
        let mut output = vec![9.0f32; 8];
        voice.render(&mut output, 4, 2, RenderContext::default());

        assert_eq!(output, vec![0.5, -0.5, 0.5, -0.5, 0.0, 0.0, 0.0, 0.0]);
        assert!(voice.is_finished());
    }

    #[test]
    fn test_renders_across_calls() {
        let mut voice = SampleVoice::new(descriptor(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]));
        let mut output = vec![0.0f32; 4];

        voice.render(&mut output, 2, 2, RenderContext::default());
        assert_eq!(output, vec![0.1, 0.2, 0.3, 0.4]);
        assert!(!voice.is_finished());

        voice.render(&mut output, 2, 2, RenderContext::default());
        assert_eq!(output, vec![0.5, 0.6, 0.0, 0.0]);
        assert!(voice.is_finished());

        // Once finished, further calls produce pure silence.
        voice.render(&mut output, 2, 2, RenderContext::default());
        assert_eq!(output, vec![0.0; 4]);
    }

    #[test]
    fn test_overwrites_scratch() {
        let mut voice = SampleVoice::new(descriptor(vec![0.5, 0.5]));
        let mut output = vec![1.0f32; 4];
        voice.render(&mut output, 2, 2, RenderContext::default());
        // Destructive write, not additive.
        assert_eq!(output, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_non_stereo_is_silent() {
        let mut voice = SampleVoice::new(descriptor(vec![0.5, 0.5]));
        let mut output = vec![1.0f32; 4];
        voice.render(&mut output, 4, 1, RenderContext::default());
        assert_eq!(output, vec![0.0; 4]);
    }

    #[test]
    fn test_reset_and_reinitialize() {
        let mut voice = SampleVoice::new(descriptor(vec![0.5, -0.5]));
        let mut output = vec![0.0f32; 2];
        voice.render(&mut output, 1, 2, RenderContext::default());
        assert!(voice.is_finished());

        voice.reset();
        assert!(!voice.is_finished());
        assert_eq!(voice.position(), 0);

        voice.reinitialize(descriptor(vec![0.7, 0.7]));
        voice.render(&mut output, 1, 2, RenderContext::default());
        assert_eq!(output, vec![0.7, 0.7]);
    }

    #[test]
    fn test_idle_voice_is_finished_silence() {
        let mut voice = SampleVoice::idle();
        assert!(voice.is_finished());
        let mut output = vec![1.0f32; 4];
        voice.render(&mut output, 2, 2, RenderContext::default());
        assert_eq!(output, vec![0.0; 4]);
    }
}
