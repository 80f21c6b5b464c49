//! Waveform side-channel: bounded transport of post-mix audio snapshots
//! from the audio thread to a visualizer.
//!
//! The queue carries pooled buffer handles, so a dropped or consumed frame
//! automatically returns its buffer to the [`BufferPool`]. Push and pop are
//! lock-free; the audio thread never waits on a slow consumer, it just
//! skips frames.

use crate::buffer_pool::{BufferHandle, BufferPool};
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;

/// Bounded single-producer/single-consumer queue of waveform frames.
/// The producer is the audio thread; the consumer is a UI thread.
pub struct WaveformQueue {
    queue: ArrayQueue<BufferHandle>,
}

impl WaveformQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "waveform queue capacity must be non-zero");
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Enqueues a frame. On a full queue the frame is dropped (its buffer
    /// goes straight back to the pool) and `false` is returned.
    pub fn try_push(&self, frame: BufferHandle) -> bool {
        self.queue.push(frame).is_ok()
    }

    /// Dequeues the oldest frame, if any.
    pub fn try_pop(&self) -> Option<BufferHandle> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

/// A tap: copies a node's post-mix output into a pooled buffer and hands it
/// to a waveform queue. Held by the mixer (master tap) and optionally by
/// track sequencers.
#[derive(Clone)]
pub struct WaveformTap {
    pool: BufferPool,
    queue: Arc<WaveformQueue>,
}

impl WaveformTap {
    pub fn new(pool: BufferPool, queue: Arc<WaveformQueue>) -> Self {
        Self { pool, queue }
    }

    /// Captures one frame of audio. Pool exhaustion or a full queue drop
    /// the frame; visualization is best-effort.
    pub fn capture(&self, data: &[f32]) {
        let Some(mut buffer) = self.pool.acquire() else {
            return;
        };
        let take = data.len().min(buffer.len());
        buffer[..take].copy_from_slice(&data[..take]);
        self.queue.try_push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_fifo() {
        let pool = BufferPool::new(4, 8);
        let queue = WaveformQueue::new(4);

        for value in [0.1f32, 0.2, 0.3] {
            let mut buffer = pool.acquire().unwrap();
            buffer[0] = value;
            assert!(queue.try_push(buffer));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_pop().unwrap()[0], 0.1);
        assert_eq!(queue.try_pop().unwrap()[0], 0.2);
        assert_eq!(queue.try_pop().unwrap()[0], 0.3);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_full_queue_returns_buffer_to_pool() {
        let pool = BufferPool::new(4, 8);
        let queue = WaveformQueue::new(2);

        assert!(queue.try_push(pool.acquire().unwrap()));
        assert!(queue.try_push(pool.acquire().unwrap()));
        // Queue full: the rejected frame's buffer must come straight back.
        assert!(!queue.try_push(pool.acquire().unwrap()));
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_consumed_frame_recycles_buffer() {
        let pool = BufferPool::new(1, 8);
        let queue = WaveformQueue::new(2);

        queue.try_push(pool.acquire().unwrap());
        assert_eq!(pool.available(), 0);

        let frame = queue.try_pop().unwrap();
        drop(frame);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_tap_copies_audio() {
        let pool = BufferPool::new(2, 4);
        let queue = Arc::new(WaveformQueue::new(2));
        let tap = WaveformTap::new(pool.clone(), Arc::clone(&queue));

        tap.capture(&[0.5, -0.5, 0.25, -0.25, 0.9, 0.9]);

        let frame = queue.try_pop().unwrap();
        // Longer input is truncated to the transport buffer size.
        assert_eq!(&frame[..], &[0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn test_tap_skips_on_dry_pool() {
        let pool = BufferPool::new(1, 4);
        let queue = Arc::new(WaveformQueue::new(4));
        let tap = WaveformTap::new(pool.clone(), Arc::clone(&queue));

        let _held = pool.acquire().unwrap();
        tap.capture(&[0.5, 0.5]);
        assert!(queue.is_empty());
    }
}
