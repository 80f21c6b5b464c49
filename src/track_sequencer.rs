//! Plays a track: its patterns in order, with per-track gain and pan.

use crate::pattern_sequencer::PatternSequencer;
use crate::render_node::RenderNode;
use crate::types::RenderContext;
use crate::waveform::WaveformTap;

pub struct TrackSequencer {
    patterns: Vec<PatternSequencer>,
    current_index: usize,
    volume: f32,
    pan: f32,
    /// Optional per-track waveform tap; off by default because every tap
    /// draws from the shared buffer pool.
    tap: Option<WaveformTap>,
}

impl TrackSequencer {
    pub fn new(volume: f32, pan: f32) -> Self {
        Self {
            patterns: Vec::new(),
            current_index: 0,
            volume: volume.clamp(0.0, 1.0),
            pan: pan.clamp(-1.0, 1.0),
            tap: None,
        }
    }

    pub fn add_pattern(&mut self, sequencer: PatternSequencer) {
        self.patterns.push(sequencer);
    }

    pub fn set_tap(&mut self, tap: WaveformTap) {
        self.tap = Some(tap);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

impl RenderNode for TrackSequencer {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, ctx: RenderContext) {
        let out = &mut output[..frames * channels];
        if self.patterns.is_empty() || self.is_finished() {
            out.fill(0.0);
            return;
        }

        let index = self.current_index;
        self.patterns[index].render(out, frames, channels, ctx);

        // Linear pan-and-gain over stereo frames.
        if channels == 2 {
            let left_gain = self.volume * (1.0 - self.pan.max(0.0));
            let right_gain = self.volume * (1.0 + self.pan.min(0.0));
            for frame in out.chunks_exact_mut(2) {
                frame[0] *= left_gain;
                frame[1] *= right_gain;
            }
        }

        if let Some(tap) = &self.tap {
            tap.capture(out);
        }

        // Loop or advance once the pattern has scheduled its whole cycle.
        // The reset keeps ringing voices, so tails cross the boundary.
        if self.patterns[index].has_completed_cycle() {
            if ctx.is_looping {
                self.patterns[index].reset();
                self.current_index = 0;
            } else if index + 1 < self.patterns.len() {
                self.patterns[index].reset();
                self.current_index = index + 1;
            }
        }
    }

    fn reset(&mut self) {
        self.current_index = 0;
        for pattern in &mut self.patterns {
            pattern.reset();
        }
    }

    fn is_finished(&self) -> bool {
        match self.patterns.len() {
            0 => true,
            len => self.current_index >= len - 1 && self.patterns[self.current_index].is_finished(),
        }
    }
}
