//! Playback choreography: snapshots project state, builds render graphs,
//! and installs them on the engine's proxy.
//!
//! Everything expensive (registry lookups, blueprint assembly, allocation)
//! happens here on the control thread. The audio thread only ever receives
//! finished, self-contained graphs through the proxy's atomic swap, plus
//! individual voices through the mixer's lock-free inbox.

use crate::buffer_pool::BufferPool;
use crate::mixer::{Mixer, MixerHandle};
use crate::pattern::Track;
use crate::pattern_sequencer::{PatternSequencer, SampleBlueprint};
use crate::proxy::{GraphCell, Proxy};
use crate::sample_manager::SampleManager;
use crate::settings::AudioSettings;
use crate::track_manager::TrackManager;
use crate::track_sequencer::TrackSequencer;
use crate::types::SampleDescriptor;
use crate::voice_pool::VoicePool;
use crate::waveform::{WaveformQueue, WaveformTap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct PlaybackCoordinator {
    proxy: Arc<Proxy>,
    samples: Arc<SampleManager>,
    tracks: Arc<TrackManager>,
    voice_pool: VoicePool,
    buffer_pool: BufferPool,
    master_queue: Arc<WaveformQueue>,
    track_queues: Mutex<HashMap<i32, Arc<WaveformQueue>>>,
    mixer_handle: Mutex<Option<MixerHandle>>,
    track_taps_enabled: AtomicBool,
    sample_rate: f32,
    max_block_frames: usize,
    waveform_queue_capacity: usize,
}

impl PlaybackCoordinator {
    pub fn new(
        proxy: Arc<Proxy>,
        samples: Arc<SampleManager>,
        tracks: Arc<TrackManager>,
        settings: &AudioSettings,
    ) -> Self {
        Self {
            proxy,
            samples,
            tracks,
            voice_pool: VoicePool::new(settings.sample_unit_pool_size),
            buffer_pool: BufferPool::new(
                settings.buffer_pool_size,
                settings.buffer_pool_buffer_size,
            ),
            master_queue: Arc::new(WaveformQueue::new(settings.waveform_queue_capacity)),
            track_queues: Mutex::new(HashMap::new()),
            mixer_handle: Mutex::new(None),
            track_taps_enabled: AtomicBool::new(false),
            sample_rate: settings.sample_rate as f32,
            max_block_frames: settings.buffer_frames as usize,
            waveform_queue_capacity: settings.waveform_queue_capacity,
        }
    }

    /// Replaces any current playback with the given track.
    pub fn play_track(&self, track_id: i32) -> bool {
        self.stop_playback();
        self.ensure_track_queue(track_id);

        let Some(sequencer) = self.build_track_sequencer(track_id) else {
            warn!(track_id, "cannot play unknown track");
            return false;
        };

        let mut mixer = self.new_master_mixer();
        mixer.add(Box::new(sequencer));
        self.install(mixer);
        info!(track_id, "playing track");
        true
    }

    /// Replaces any current playback with every registered track at once.
    pub fn play_all_tracks(&self) -> bool {
        self.stop_playback();

        let ids = self.tracks.all_track_ids();
        let mut mixer = self.new_master_mixer();
        let mut added = 0;
        for track_id in ids {
            self.ensure_track_queue(track_id);
            if let Some(sequencer) = self.build_track_sequencer(track_id) {
                mixer.add(Box::new(sequencer));
                added += 1;
            }
        }
        if added == 0 {
            return false;
        }
        self.install(mixer);
        info!(tracks = added, "playing all tracks");
        true
    }

    /// Auditions one sample immediately, mixing it over whatever is
    /// already playing. Dropped silently when the voice pool is dry.
    pub fn play_sample(&self, descriptor: SampleDescriptor) -> bool {
        let Some(mut voice) = self.voice_pool.acquire() else {
            warn!("voice pool exhausted, dropping sample audition");
            return false;
        };
        voice.reinitialize(descriptor);

        let handle = self.mixer_handle.lock().unwrap();
        if self.proxy.has_delegate() {
            if let Some(handle) = handle.as_ref() {
                return handle.add(Box::new(voice));
            }
        }
        drop(handle);

        let mut mixer = self.new_master_mixer();
        mixer.add(Box::new(voice));
        self.install(mixer);
        true
    }

    /// The only cancellation: swaps the graph out (it drops here, on the
    /// control thread) and discards per-track waveform queues.
    pub fn stop_playback(&self) {
        let old = self.proxy.take_delegate();
        *self.mixer_handle.lock().unwrap() = None;
        self.track_queues.lock().unwrap().clear();
        drop(old);
        debug!("playback stopped");
    }

    /// True while an installed graph still has audible children pending.
    pub fn is_playing(&self) -> bool {
        if !self.proxy.has_delegate() {
            return false;
        }
        self.mixer_handle
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, MixerHandle::is_active)
    }

    /// Stored atomically; the audio thread picks the new tempo up on its
    /// next callback.
    pub fn set_bpm(&self, bpm: f32) {
        self.proxy.set_bpm(bpm);
    }

    pub fn bpm(&self) -> f32 {
        self.proxy.bpm()
    }

    pub fn set_loop_playback(&self, is_looping: bool) {
        self.proxy.set_looping(is_looping);
    }

    pub fn loop_playback(&self) -> bool {
        self.proxy.is_looping()
    }

    /// Opts in to per-track waveform taps. Every tap draws from the shared
    /// buffer pool, so lagging consumers can starve the master tap; the
    /// default is master-only.
    pub fn set_track_taps_enabled(&self, enabled: bool) {
        self.track_taps_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn master_waveform_queue(&self) -> Arc<WaveformQueue> {
        Arc::clone(&self.master_queue)
    }

    /// The waveform queue of a playing track, if one exists.
    pub fn track_waveform_queue(&self, track_id: i32) -> Option<Arc<WaveformQueue>> {
        self.track_queues.lock().unwrap().get(&track_id).cloned()
    }

    pub fn voice_pool(&self) -> &VoicePool {
        &self.voice_pool
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    fn new_master_mixer(&self) -> Mixer {
        let mut mixer = Mixer::new(self.max_block_frames);
        mixer.set_tap(WaveformTap::new(
            self.buffer_pool.clone(),
            Arc::clone(&self.master_queue),
        ));
        mixer
    }

    fn install(&self, mixer: Mixer) {
        *self.mixer_handle.lock().unwrap() = Some(mixer.handle());
        self.proxy
            .set_delegate(Some(Arc::new(GraphCell::new(Box::new(mixer)))));
    }

    fn ensure_track_queue(&self, track_id: i32) -> Arc<WaveformQueue> {
        let mut queues = self.track_queues.lock().unwrap();
        Arc::clone(queues.entry(track_id).or_insert_with(|| {
            Arc::new(WaveformQueue::new(self.waveform_queue_capacity))
        }))
    }

    /// Snapshots the track, resolves every referenced sample up front, and
    /// assembles the sequencer tree the audio thread will own.
    fn build_track_sequencer(&self, track_id: i32) -> Option<TrackSequencer> {
        let track = self.tracks.get_track(track_id)?;
        let blueprint = Arc::new(self.assemble_blueprint(&track));

        let mut sequencer = TrackSequencer::new(track.volume(), track.pan());
        if self.track_taps_enabled.load(Ordering::Relaxed) {
            let queue = self.ensure_track_queue(track_id);
            sequencer.set_tap(WaveformTap::new(self.buffer_pool.clone(), queue));
        }

        for pattern in &track.patterns {
            sequencer.add_pattern(PatternSequencer::new(
                pattern.clone(),
                Arc::clone(&blueprint),
                self.voice_pool.clone(),
                self.sample_rate,
                self.max_block_frames,
            ));
        }
        Some(sequencer)
    }

    /// One blueprint per track: every distinct sample id referenced by any
    /// of its patterns, resolved to a descriptor. Misses are logged and
    /// skipped; those steps will play as rests.
    fn assemble_blueprint(&self, track: &Track) -> SampleBlueprint {
        let mut blueprint = SampleBlueprint::new();
        for pattern in &track.patterns {
            for &step in &pattern.steps {
                if step >= 0 && !blueprint.contains_key(&step) {
                    match self.samples.get_sample(step) {
                        Some(descriptor) => {
                            blueprint.insert(step, descriptor);
                        }
                        None => {
                            debug!(sample_id = step, "unresolved sample id, steps will rest")
                        }
                    }
                }
            }
        }
        blueprint
    }
}
