//! Real-time safe sequencer for a single step pattern.
//!
//! Given everything it needs at construction (pattern copy, pre-resolved
//! sample blueprint, voice pool, sample rate), the sequencer schedules
//! step triggers and mixes its active voices without ever touching a
//! registry, a lock, or the allocator from `render`.

use crate::pattern::StepPattern;
use crate::render_node::RenderNode;
use crate::types::{RenderContext, SampleDescriptor};
use crate::voice_pool::{VoiceHandle, VoicePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Map from every sample id a pattern references to its fully resolved
/// descriptor. Assembled on the control thread so rendering is lookup-only.
pub type SampleBlueprint = HashMap<i32, SampleDescriptor>;

/// Upper bound of simultaneously ringing voices per pattern.
const MAX_ACTIVE_VOICES: usize = 64;

pub struct PatternSequencer {
    /// Owned copy of the pattern, including its runtime timing cursors.
    pattern: StepPattern,
    blueprint: Arc<SampleBlueprint>,
    pool: VoicePool,
    sample_rate: f32,
    completed_cycle: bool,
    active: Vec<VoiceHandle>,
    scratch: Vec<f32>,
}

impl PatternSequencer {
    /// `max_block_frames` sizes the scratch buffer; larger callbacks fall
    /// back to chunked rendering rather than allocating.
    pub fn new(
        pattern: StepPattern,
        blueprint: Arc<SampleBlueprint>,
        pool: VoicePool,
        sample_rate: f32,
        max_block_frames: usize,
    ) -> Self {
        Self {
            pattern,
            blueprint,
            pool,
            sample_rate,
            completed_cycle: false,
            active: Vec::with_capacity(MAX_ACTIVE_VOICES),
            scratch: vec![0.0; max_block_frames.max(1) * 2],
        }
    }

    /// True once every step of the cycle has been scheduled. The parent
    /// decides whether to loop; this sequencer never wraps on its own.
    pub fn has_completed_cycle(&self) -> bool {
        self.completed_cycle
    }

    pub fn active_voices(&self) -> usize {
        self.active.len()
    }

    pub fn current_step(&self) -> usize {
        self.pattern.current_step
    }

    /// Walks the step grid forward by one render block, arming a voice for
    /// every non-rest step whose time has come.
    fn schedule(&mut self, frames: usize, ctx: RenderContext) {
        let ms_per_beat = 60_000.0 / ctx.bpm;
        // Recomputed every block: bpm may change between callbacks.
        let step_interval_ms = ms_per_beat / self.pattern.steps_per_beat;

        self.pattern.elapsed_ms += frames as f32 / self.sample_rate * 1000.0;

        while self.pattern.elapsed_ms >= step_interval_ms
            && self.pattern.current_step < self.pattern.steps.len()
        {
            let step = self.pattern.steps[self.pattern.current_step];
            if step >= 0 {
                if let Some(descriptor) = self.blueprint.get(&step).cloned() {
                    self.trigger(descriptor);
                }
                // Unresolved ids play as rests; the pattern keeps going.
            }

            self.pattern.current_step += 1;
            if self.pattern.current_step >= self.pattern.steps.len() {
                self.completed_cycle = true;
            }
            // Subtraction, not modulo: keeps the sub-step fraction so the
            // grid never drifts.
            self.pattern.elapsed_ms -= step_interval_ms;
        }
    }

    fn trigger(&mut self, descriptor: SampleDescriptor) {
        // Pool exhaustion drops the note; the pool counts the miss.
        let Some(mut voice) = self.pool.acquire() else {
            return;
        };
        voice.reinitialize(descriptor);
        if self.active.len() < MAX_ACTIVE_VOICES {
            self.active.push(voice);
        }
        // Over the cap the handle drops here and the voice goes back.
    }
}

impl RenderNode for PatternSequencer {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, ctx: RenderContext) {
        let out = &mut output[..frames * channels];

        if self.pattern.steps.is_empty() {
            // Nothing will ever be scheduled; finish immediately.
            self.completed_cycle = true;
            out.fill(0.0);
            return;
        }

        if !self.completed_cycle {
            self.schedule(frames, ctx);
        }

        out.fill(0.0);
        if self.active.is_empty() {
            return;
        }

        // Mix through the pre-sized scratch; oversized callbacks are
        // processed in chunks so this path never allocates.
        let chunk_samples = (self.scratch.len() / channels).max(1) * channels;
        for chunk in out.chunks_mut(chunk_samples) {
            let chunk_frames = chunk.len() / channels;
            for voice in &mut self.active {
                let scratch = &mut self.scratch[..chunk.len()];
                voice.render(scratch, chunk_frames, channels, ctx);
                for (dst, src) in chunk.iter_mut().zip(scratch.iter()) {
                    *dst += *src;
                }
            }
        }

        // Finished voices drop here; each handle returns to the pool.
        self.active.retain(|voice| !voice.is_finished());
    }

    /// Rewinds the step grid. Active voices are deliberately left ringing
    /// so tails carry across loop boundaries.
    fn reset(&mut self) {
        self.pattern.rewind();
        self.completed_cycle = false;
    }

    /// Finished only after the full cycle is scheduled AND every tail has
    /// rung out.
    fn is_finished(&self) -> bool {
        self.completed_cycle && self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::REST;
    use crate::types::{PcmData, SampleMetadata};

    const SAMPLE_RATE: f32 = 44100.0;

    fn blueprint_with(entries: &[(i32, Vec<f32>)]) -> Arc<SampleBlueprint> {
        let mut blueprint = SampleBlueprint::new();
        for (id, samples) in entries {
            blueprint.insert(
                *id,
                SampleDescriptor {
                    registry_id: *id,
                    pcm: Arc::new(PcmData::new(samples.clone())),
                    metadata: SampleMetadata {
                        source_sample_rate: 44100,
                        bit_depth: 16,
                    },
                },
            );
        }
        Arc::new(blueprint)
    }

    fn ctx(bpm: f32) -> RenderContext {
        RenderContext {
            is_looping: false,
            bpm,
        }
    }

    /// 2205 frames at 44.1 kHz = 50 ms per render call.
    const BLOCK_FRAMES: usize = 2205;

    fn render_block(sequencer: &mut PatternSequencer, bpm: f32) -> Vec<f32> {
        let mut output = vec![0.0f32; BLOCK_FRAMES * 2];
        sequencer.render(&mut output, BLOCK_FRAMES, 2, ctx(bpm));
        output
    }

    #[test]
    fn test_cycle_completes_on_schedule() {
        // steps [0, rest, 0] at 120 bpm, 4 steps per beat => 125 ms steps.
        // 375 ms of grid over 50 ms blocks completes on call ceil(7.5) = 8.
        let blueprint = blueprint_with(&[(0, vec![0.5, -0.5])]);
        let pool = VoicePool::new(8);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0, REST, 0], 4.0),
            blueprint,
            pool,
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        for call in 1..=7 {
            render_block(&mut sequencer, 120.0);
            assert!(
                !sequencer.has_completed_cycle(),
                "cycle ended early at call {call}"
            );
        }
        render_block(&mut sequencer, 120.0);
        assert!(sequencer.has_completed_cycle());
        assert_eq!(sequencer.current_step(), 3);
    }

    #[test]
    fn test_triggers_land_one_interval_apart() {
        let blueprint = blueprint_with(&[(0, vec![0.5; 8])]);
        let pool = VoicePool::new(8);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0, REST, 0], 4.0),
            blueprint,
            pool.clone(),
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        let mut trigger_calls = Vec::new();
        for call in 1..=8 {
            let before = pool.stats().0;
            render_block(&mut sequencer, 120.0);
            if pool.stats().0 > before {
                trigger_calls.push(call);
            }
        }
        // 125 ms interval over 50 ms blocks: the two notes arm 125 ms apart.
        assert_eq!(trigger_calls, vec![3, 8]);
    }

    #[test]
    fn test_rest_steps_do_not_acquire() {
        let blueprint = blueprint_with(&[(0, vec![0.5, 0.5])]);
        let pool = VoicePool::new(8);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![REST, REST, REST, REST], 4.0),
            blueprint,
            pool.clone(),
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        for _ in 0..10 {
            render_block(&mut sequencer, 120.0);
        }
        assert!(sequencer.has_completed_cycle());
        assert!(sequencer.is_finished());
        assert_eq!(pool.stats().0, 0);
    }

    #[test]
    fn test_unknown_sample_id_plays_as_rest() {
        let blueprint = blueprint_with(&[(0, vec![0.5, 0.5])]);
        let pool = VoicePool::new(8);
        let mut sequencer = PatternSequencer::new(
            // id 9 is not in the blueprint.
            StepPattern::new(vec![9, 9], 4.0),
            blueprint,
            pool.clone(),
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        for _ in 0..6 {
            let output = render_block(&mut sequencer, 120.0);
            assert!(output.iter().all(|&x| x == 0.0));
        }
        assert!(sequencer.is_finished());
        assert_eq!(pool.stats().0, 0);
    }

    #[test]
    fn test_pool_exhaustion_drops_notes_without_failing() {
        // Three simultaneous triggers into a two-voice pool: very fast grid
        // so all three steps land inside one render call.
        let blueprint = blueprint_with(&[(0, vec![0.25; 16384])]);
        let pool = VoicePool::new(2);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0, 0, 0], 4800.0),
            blueprint,
            pool.clone(),
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        let output = render_block(&mut sequencer, 120.0);
        assert_eq!(sequencer.active_voices(), 2);
        let (acquires, misses) = pool.stats();
        assert_eq!(acquires, 2);
        assert_eq!(misses, 1);
        // Two voices mixed: 0.25 + 0.25 once both are armed.
        assert!(output.iter().any(|&x| (x - 0.5).abs() < 1e-6));
        assert!(!sequencer.is_finished(), "tails still ringing");
    }

    #[test]
    fn test_finished_waits_for_tails() {
        // One long sample triggered by the only step: the cycle completes
        // while the tail is still sounding.
        let tail_len = (BLOCK_FRAMES * 2) * 6;
        let blueprint = blueprint_with(&[(0, vec![0.1; tail_len])]);
        let pool = VoicePool::new(4);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0], 4.0),
            blueprint,
            pool,
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        // 125 ms grid: complete after 3 blocks.
        for _ in 0..3 {
            render_block(&mut sequencer, 120.0);
        }
        assert!(sequencer.has_completed_cycle());
        assert!(!sequencer.is_finished());

        let mut guard = 0;
        while !sequencer.is_finished() {
            render_block(&mut sequencer, 120.0);
            guard += 1;
            assert!(guard < 32, "tail never drained");
        }
    }

    #[test]
    fn test_reset_preserves_active_voices() {
        let tail_len = (BLOCK_FRAMES * 2) * 4;
        let blueprint = blueprint_with(&[(0, vec![0.2; tail_len])]);
        let pool = VoicePool::new(4);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0], 4.0),
            blueprint,
            pool,
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        for _ in 0..3 {
            render_block(&mut sequencer, 120.0);
        }
        let ringing = sequencer.active_voices();
        assert!(ringing > 0);

        sequencer.reset();
        assert_eq!(sequencer.current_step(), 0);
        assert!(!sequencer.has_completed_cycle());
        // The tail must survive the rewind.
        assert_eq!(sequencer.active_voices(), ringing);
        let output = render_block(&mut sequencer, 120.0);
        assert!(output.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_bpm_change_mid_pattern() {
        let blueprint = blueprint_with(&[(0, vec![0.5, 0.5])]);
        let pool = VoicePool::new(8);
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0, 0, 0, 0], 4.0),
            blueprint,
            pool,
            SAMPLE_RATE,
            BLOCK_FRAMES,
        );

        // At 240 bpm the interval is 62.5 ms: the whole 250 ms grid fits
        // in ceil(250/50) = 5 blocks.
        for _ in 0..5 {
            render_block(&mut sequencer, 240.0);
        }
        assert!(sequencer.has_completed_cycle());
    }

    #[test]
    fn test_oversized_callback_renders_in_chunks() {
        let blueprint = blueprint_with(&[(0, vec![0.5; 64])]);
        let pool = VoicePool::new(4);
        // Scratch sized for 16-frame blocks.
        let mut sequencer = PatternSequencer::new(
            StepPattern::new(vec![0], 16.0),
            blueprint,
            pool,
            1000.0,
            16,
        );

        // 64-frame request against a 16-frame scratch: four chunks.
        let mut output = vec![0.0f32; 64 * 2];
        // 64 frames at 1 kHz = 64 ms >= 31.25 ms interval: step triggers.
        sequencer.render(&mut output, 64, 2, ctx(120.0));
        assert!(output.iter().any(|&x| x != 0.0));
    }
}
