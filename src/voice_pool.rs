//! Fixed-capacity pool of recycled sample voices.
//!
//! This module provides the allocation-free voice supply for the audio
//! thread. All voices are boxed up front; acquire and release are single
//! lock-free queue operations.
//!
//! # Design
//! - Lock-free ArrayQueue as the free list
//! - Pre-allocated voices; the pool never grows
//! - `acquire` returns a smart handle whose drop resets the voice and
//!   pushes it back
//! - Exhaustion is not an error: `acquire` returns `None` and the caller
//!   drops the note (counted in the stats)
//! - A checkout flag on every voice catches double checkout / double
//!   release in debug builds

use crate::render_node::RenderNode;
use crate::types::{RenderContext, SampleDescriptor};
use crate::voice::SampleVoice;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct PoolInner {
    free: ArrayQueue<Box<SampleVoice>>,
    capacity: usize,
    acquires: AtomicUsize,
    misses: AtomicUsize,
}

/// Shared, cloneable pool of pre-allocated [`SampleVoice`]s.
///
/// Clones share the same underlying pool, so one pool can feed every
/// sequencer in a graph.
#[derive(Clone)]
pub struct VoicePool {
    inner: Arc<PoolInner>,
}

impl VoicePool {
    /// Pre-allocates `size` voices. A zero-sized pool is a configuration
    /// error and panics.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "voice pool size must be non-zero");
        let free = ArrayQueue::new(size);
        for _ in 0..size {
            let pushed = free.push(Box::new(SampleVoice::idle())).is_ok();
            debug_assert!(pushed);
        }
        Self {
            inner: Arc::new(PoolInner {
                free,
                capacity: size,
                acquires: AtomicUsize::new(0),
                misses: AtomicUsize::new(0),
            }),
        }
    }

    /// Pops a free voice, or `None` when every voice is checked out.
    /// Safe to call from the audio thread; never allocates, never blocks.
    pub fn acquire(&self) -> Option<VoiceHandle> {
        match self.inner.free.pop() {
            Some(mut voice) => {
                debug_assert!(!voice.is_checked_out(), "voice pool double checkout");
                voice.set_checked_out(true);
                self.inner.acquires.fetch_add(1, Ordering::Relaxed);
                Some(VoiceHandle {
                    voice: Some(voice),
                    pool: Arc::clone(&self.inner),
                })
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Voices currently sitting in the free list.
    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    /// Returns (acquires, misses). Misses are dropped notes.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.inner.acquires.load(Ordering::Relaxed),
            self.inner.misses.load(Ordering::Relaxed),
        )
    }
}

/// Custodial handle to a checked-out voice. Dropping it resets the voice
/// and returns it to the pool's free list.
pub struct VoiceHandle {
    voice: Option<Box<SampleVoice>>,
    pool: Arc<PoolInner>,
}

impl VoiceHandle {
    pub fn reinitialize(&mut self, descriptor: SampleDescriptor) {
        if let Some(voice) = self.voice.as_deref_mut() {
            voice.reinitialize(descriptor);
        }
    }

    pub fn position(&self) -> usize {
        self.voice.as_deref().map_or(0, SampleVoice::position)
    }
}

impl RenderNode for VoiceHandle {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, ctx: RenderContext) {
        match self.voice.as_deref_mut() {
            Some(voice) => voice.render(output, frames, channels, ctx),
            None => output[..frames * channels].fill(0.0),
        }
    }

    fn reset(&mut self) {
        if let Some(voice) = self.voice.as_deref_mut() {
            voice.reset();
        }
    }

    fn is_finished(&self) -> bool {
        self.voice.as_deref().map_or(true, SampleVoice::is_finished)
    }
}

impl Drop for VoiceHandle {
    fn drop(&mut self) {
        if let Some(mut voice) = self.voice.take() {
            debug_assert!(voice.is_checked_out(), "voice pool double release");
            voice.reset();
            voice.set_checked_out(false);
            let returned = self.pool.free.push(voice).is_ok();
            // A failed push means more releases than the pool has slots.
            debug_assert!(returned, "voice pool free list overflow");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PcmData, SampleMetadata};

    fn descriptor() -> SampleDescriptor {
        SampleDescriptor {
            registry_id: 0,
            pcm: Arc::new(PcmData::new(vec![0.5, -0.5])),
            metadata: SampleMetadata {
                source_sample_rate: 44100,
                bit_depth: 16,
            },
        }
    }

    #[test]
    fn test_pool_is_exactly_sized() {
        let pool = VoicePool::new(10);
        let mut held = Vec::new();
        for _ in 0..10 {
            held.push(pool.acquire().expect("pool should not run out early"));
        }
        assert!(pool.acquire().is_none(), "pool should be exhausted");

        drop(held);
        // Every voice came back; a full sweep succeeds again.
        let reacquired: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(reacquired.len(), 10);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_drop_returns_voice() {
        let pool = VoicePool::new(1);
        let handle = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());

        drop(handle);
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn test_released_voice_is_reset() {
        let pool = VoicePool::new(1);
        let mut handle = pool.acquire().unwrap();
        handle.reinitialize(descriptor());
        let mut output = vec![0.0f32; 2];
        handle.render(&mut output, 1, 2, RenderContext::default());
        assert_eq!(handle.position(), 2);
        drop(handle);

        let handle = pool.acquire().unwrap();
        assert_eq!(handle.position(), 0);
    }

    #[test]
    fn test_exhaustion_is_counted() {
        let pool = VoicePool::new(2);
        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert!(pool.acquire().is_none());

        let (acquires, misses) = pool.stats();
        assert_eq!(acquires, 2);
        assert_eq!(misses, 2);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_size_is_fatal() {
        let _ = VoicePool::new(0);
    }

    #[test]
    fn test_thread_safety() {
        use std::thread;

        let pool = VoicePool::new(50);
        let mut handles = vec![];

        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    if let Some(mut voice) = pool.acquire() {
                        voice.reinitialize(SampleDescriptor {
                            registry_id: 1,
                            pcm: Arc::new(PcmData::new(vec![0.1, 0.1])),
                            metadata: SampleMetadata {
                                source_sample_rate: 44100,
                                bit_depth: 16,
                            },
                        });
                        std::hint::black_box(&voice);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // No voice was lost or duplicated.
        assert_eq!(pool.available(), 50);
        let mut held = Vec::new();
        for _ in 0..50 {
            held.push(pool.acquire().expect("all voices should be free again"));
        }
        assert!(pool.acquire().is_none());
    }
}
