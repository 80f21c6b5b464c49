//! Plays a built-in drum pattern through the default output device.
//!
//! Synthesizes a kick, snare and hat directly into the sample cache (no
//! files needed), builds a two-pattern track, and plays it for a while.
//!
//! Run with: cargo run --bin ostinato-demo -- --bpm 132 --seconds 8

use clap::Parser;
use ostinato::coordinator::PlaybackCoordinator;
use ostinato::engine::Engine;
use ostinato::error::EngineError;
use ostinato::pattern::{StepPattern, REST};
use ostinato::sample_manager::SampleManager;
use ostinato::settings::AudioSettings;
use ostinato::track_manager::TrackManager;
use ostinato::types::SampleMetadata;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ostinato-demo", about = "Step tracker playback demo")]
struct Args {
    /// Playback tempo in beats per minute
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// How long to play before stopping
    #[arg(long, default_value_t = 8)]
    seconds: u64,

    /// Play the track once instead of looping it
    #[arg(long, default_value_t = false)]
    no_loop: bool,

    /// Output sample rate
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Play a 440 Hz diagnostic tone instead of the drum track
    #[arg(long, default_value_t = false)]
    tone: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let settings = AudioSettings {
        sample_rate: args.sample_rate,
        initial_bpm: args.bpm,
        initial_is_looping: !args.no_loop,
        ..AudioSettings::default()
    };

    let mut engine = Engine::new(settings.clone());
    engine.select_default_device()?;
    engine.start()?;

    if args.tone {
        return play_tone(&engine, args.seconds);
    }

    let samples = Arc::new(SampleManager::new(settings.cache_capacity));
    let tracks = Arc::new(TrackManager::new());

    let sr = settings.sample_rate;
    let kick = samples.add_sample("builtin:kick", synth_kick(sr), meta(sr));
    let snare = samples.add_sample("builtin:snare", synth_snare(sr), meta(sr));
    let hat = samples.add_sample("builtin:hat", synth_hat(sr), meta(sr));

    let track_id = tracks.create_track("demo beat");
    tracks.add_pattern_to_track(
        track_id,
        StepPattern::new(
            vec![
                kick, REST, hat, REST, snare, REST, hat, REST, kick, kick, hat, REST, snare, REST,
                hat, hat,
            ],
            4.0,
        ),
    );
    tracks.add_pattern_to_track(
        track_id,
        StepPattern::new(
            vec![
                kick, REST, hat, hat, snare, REST, hat, REST, kick, REST, hat, hat, snare, snare,
                hat, hat,
            ],
            4.0,
        ),
    );

    let coordinator = PlaybackCoordinator::new(
        engine.proxy(),
        Arc::clone(&samples),
        Arc::clone(&tracks),
        &settings,
    );

    if !coordinator.play_track(track_id) {
        return Err(Box::new(EngineError::NoUsableOutputDevice));
    }

    info!(
        bpm = args.bpm,
        seconds = args.seconds,
        looped = !args.no_loop,
        "playing demo track"
    );
    let waveform = coordinator.master_waveform_queue();
    let mut frames_seen = 0usize;
    for _ in 0..args.seconds * 10 {
        thread::sleep(Duration::from_millis(100));
        while waveform.try_pop().is_some() {
            frames_seen += 1;
        }
    }

    coordinator.stop_playback();
    engine.stop()?;

    let (voice_acquires, voice_misses) = coordinator.voice_pool().stats();
    let (buffer_acquires, buffer_misses) = coordinator.buffer_pool().stats();
    info!(
        voice_acquires,
        voice_misses, buffer_acquires, buffer_misses, frames_seen, "playback finished"
    );
    Ok(())
}

fn play_tone(engine: &Engine, seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    use ostinato::proxy::GraphCell;
    use ostinato::tone::ToneSource;

    let proxy = engine.proxy();
    proxy.set_delegate(Some(Arc::new(GraphCell::new(Box::new(ToneSource::new(
        440.0,
        engine.settings().sample_rate as f32,
    ))))));
    info!(seconds, "playing diagnostic tone");
    thread::sleep(Duration::from_secs(seconds));
    proxy.set_delegate(None);
    Ok(())
}

fn meta(sample_rate: u32) -> SampleMetadata {
    SampleMetadata {
        source_sample_rate: sample_rate,
        bit_depth: 16,
    }
}

/// Pitched-down sine with an exponential amplitude decay.
fn synth_kick(sample_rate: u32) -> Vec<f32> {
    let len = (sample_rate as f32 * 0.25) as usize;
    let mut samples = Vec::with_capacity(len * 2);
    let mut phase = 0.0f32;
    for i in 0..len {
        let t = i as f32 / sample_rate as f32;
        let freq = 120.0 * (-t * 18.0).exp() + 45.0;
        phase += std::f32::consts::TAU * freq / sample_rate as f32;
        let amp = (-t * 22.0).exp();
        let sample = phase.sin() * amp * 0.9;
        samples.push(sample);
        samples.push(sample);
    }
    samples
}

/// Noise burst with a fast decay and a bit of body tone.
fn synth_snare(sample_rate: u32) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let len = (sample_rate as f32 * 0.18) as usize;
    let mut samples = Vec::with_capacity(len * 2);
    for i in 0..len {
        let t = i as f32 / sample_rate as f32;
        let noise: f32 = rng.gen_range(-1.0..1.0);
        let body = (std::f32::consts::TAU * 180.0 * t).sin() * 0.4;
        let amp = (-t * 28.0).exp();
        let sample = (noise * 0.6 + body) * amp * 0.7;
        samples.push(sample);
        samples.push(sample);
    }
    samples
}

/// Very short bright noise tick.
fn synth_hat(sample_rate: u32) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let len = (sample_rate as f32 * 0.05) as usize;
    let mut samples = Vec::with_capacity(len * 2);
    let mut last = 0.0f32;
    for i in 0..len {
        let t = i as f32 / sample_rate as f32;
        let noise: f32 = rng.gen_range(-1.0..1.0);
        // One-pole highpass to thin the noise out.
        let bright = noise - last;
        last = noise;
        let amp = (-t * 90.0).exp();
        let sample = bright * amp * 0.4;
        samples.push(sample);
        samples.push(sample);
    }
    samples
}
