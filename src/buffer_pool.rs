//! Fixed-capacity pool of transport buffers for the waveform side-channel.
//!
//! Same shape as the voice pool: everything is allocated at construction,
//! and the audio thread's acquire/release are single lock-free queue
//! operations. When the pool runs dry the producer simply skips a frame of
//! visualization.

use crossbeam_queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct BufferPoolInner {
    free: ArrayQueue<Box<[f32]>>,
    buffer_len: usize,
    capacity: usize,
    acquires: AtomicUsize,
    misses: AtomicUsize,
}

/// Shared, cloneable pool of fixed-size float buffers.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

impl BufferPool {
    /// Pre-allocates `count` buffers of `buffer_len` floats each.
    /// Zero for either dimension is a configuration error and panics.
    pub fn new(count: usize, buffer_len: usize) -> Self {
        assert!(
            count > 0 && buffer_len > 0,
            "buffer pool dimensions must be non-zero"
        );
        let free = ArrayQueue::new(count);
        for _ in 0..count {
            let pushed = free.push(vec![0.0f32; buffer_len].into_boxed_slice()).is_ok();
            debug_assert!(pushed);
        }
        Self {
            inner: Arc::new(BufferPoolInner {
                free,
                buffer_len,
                capacity: count,
                acquires: AtomicUsize::new(0),
                misses: AtomicUsize::new(0),
            }),
        }
    }

    /// Pops a zeroed buffer, or `None` when the pool is dry.
    pub fn acquire(&self) -> Option<BufferHandle> {
        match self.inner.free.pop() {
            Some(mut buffer) => {
                buffer.fill(0.0);
                self.inner.acquires.fetch_add(1, Ordering::Relaxed);
                Some(BufferHandle {
                    buffer: Some(buffer),
                    pool: Arc::clone(&self.inner),
                })
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    /// Returns (acquires, misses). Misses are dropped visualization frames.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.inner.acquires.load(Ordering::Relaxed),
            self.inner.misses.load(Ordering::Relaxed),
        )
    }
}

/// Custodial handle to a checked-out buffer; derefs to `[f32]` and returns
/// the buffer to the pool on drop.
pub struct BufferHandle {
    buffer: Option<Box<[f32]>>,
    pool: Arc<BufferPoolInner>,
}

impl Deref for BufferHandle {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for BufferHandle {
    fn deref_mut(&mut self) -> &mut [f32] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            let returned = self.pool.free.push(buffer).is_ok();
            debug_assert!(returned, "buffer pool free list overflow");
        }
    }
}
