//! # Ostinato - Step Tracker Playback Core
//!
//! Ostinato is the real-time playback core of a sample-based music
//! tracker: tracks hold ordered step patterns, patterns trigger samples,
//! and a hardware audio callback drives the whole tree to an interleaved
//! stereo float stream.
//!
//! ## Core Features
//!
//! - **Render graph**: mixer → track → pattern → voice, composed freshly
//!   per playback start and driven lock-free on the audio thread
//! - **Drift-free sequencing**: pattern-local timing under a live-tunable
//!   BPM, with sub-step fractions carried between callbacks
//! - **Real-time safety**: fixed-capacity voice and buffer pools with RAII
//!   handles; the audio callback never allocates, locks, or blocks
//! - **Atomic graph handoff**: control threads build a new graph and swap
//!   it in with one release store; callbacks see old or new, never partial
//! - **LRU sample cache** and thread-safe registries for samples and
//!   tracks
//! - **Waveform side-channel**: bounded queues of pooled buffers carrying
//!   the post-mix signal to a visualizer
//!
//! ## Quick Start
//!
//! ### Registering and auditioning a sample
//!
//! ```
//! use ostinato::sample_manager::SampleManager;
//! use ostinato::types::SampleMetadata;
//!
//! let manager = SampleManager::new(64);
//! let id = manager.add_sample(
//!     "samples/kick.wav",
//!     vec![0.5, -0.5, 0.25, -0.25],
//!     SampleMetadata { source_sample_rate: 44100, bit_depth: 16 },
//! );
//!
//! let descriptor = manager.get_sample(id).expect("id resolves");
//! assert_eq!(descriptor.pcm.len(), 4);
//! ```
//!
//! ### Playing a track without a device
//!
//! The coordinator builds the graph; the proxy can be driven manually in
//! place of a hardware callback (tests do exactly this).
//!
//! ```
//! use ostinato::coordinator::PlaybackCoordinator;
//! use ostinato::engine::Engine;
//! use ostinato::pattern::{StepPattern, REST};
//! use ostinato::sample_manager::SampleManager;
//! use ostinato::settings::AudioSettings;
//! use ostinato::track_manager::TrackManager;
//! use ostinato::types::SampleMetadata;
//! use std::sync::Arc;
//!
//! let settings = AudioSettings::default();
//! let engine = Engine::new(settings.clone());
//! let samples = Arc::new(SampleManager::new(settings.cache_capacity));
//! let tracks = Arc::new(TrackManager::new());
//!
//! let kick = samples.add_sample(
//!     "kick",
//!     vec![0.9, 0.9, 0.6, 0.6],
//!     SampleMetadata { source_sample_rate: 44100, bit_depth: 16 },
//! );
//!
//! let track_id = tracks.create_track("drums");
//! tracks.add_pattern_to_track(track_id, StepPattern::new(vec![kick, REST, kick, REST], 4.0));
//!
//! let coordinator = PlaybackCoordinator::new(
//!     engine.proxy(),
//!     Arc::clone(&samples),
//!     Arc::clone(&tracks),
//!     &settings,
//! );
//! assert!(coordinator.play_track(track_id));
//!
//! // Stand-in for the hardware callback:
//! let proxy = engine.proxy();
//! let mut output = vec![0.0f32; 512 * 2];
//! proxy.render(&mut output, 512, 2);
//! ```
//!
//! ## Architecture
//!
//! ### Main Modules
//!
//! - [`coordinator`] - builds and installs render graphs (start here!)
//! - [`engine`] - cpal stream lifecycle and the audio callback
//! - [`pattern_sequencer`] / [`track_sequencer`] / [`mixer`] - the graph
//! - [`voice_pool`] / [`buffer_pool`] - fixed-capacity real-time pools
//! - [`sample_manager`] / [`track_manager`] - thread-safe registries
//! - [`sample_cache`] - capacity-bounded LRU over decoded PCM
//! - [`waveform`] - the visualization side-channel
//!
//! ### Threading
//!
//! Control threads mutate registries and build graphs; exactly one audio
//! thread renders; visualizer threads drain waveform queues. The only
//! crossings are the proxy's atomic delegate, lock-free pool queues, and
//! lock-free waveform queues.

pub mod buffer_pool;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod pattern;
pub mod pattern_sequencer;
pub mod proxy;
pub mod render_node;
pub mod sample_cache;
pub mod sample_loader;
pub mod sample_manager;
pub mod settings;
pub mod tone;
pub mod track_manager;
pub mod track_sequencer;
pub mod types;
pub mod voice;
pub mod voice_pool;
pub mod waveform;
