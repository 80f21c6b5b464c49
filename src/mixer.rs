//! Root mixer: sums a heterogeneous set of render nodes.
//!
//! The mixer is built on a control thread, installed on the audio thread
//! through the proxy, and from then on owned by the audio callback. Late
//! additions (e.g. one-shot sample auditions) arrive through a lock-free
//! inbox shared with the control side via [`MixerHandle`].

use crate::render_node::RenderNode;
use crate::types::RenderContext;
use crate::waveform::WaveformTap;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Most children a mixer will hold; also bounds the inbox, so a drained
/// inbox can never force the children vec to reallocate on the audio
/// thread.
const MAX_CHILDREN: usize = 64;

struct MixerShared {
    inbox: ArrayQueue<Box<dyn RenderNode>>,
    active_children: AtomicUsize,
}

pub struct Mixer {
    children: Vec<Box<dyn RenderNode>>,
    shared: Arc<MixerShared>,
    scratch: Vec<f32>,
    tap: Option<WaveformTap>,
}

impl Mixer {
    pub fn new(max_block_frames: usize) -> Self {
        Self {
            children: Vec::with_capacity(MAX_CHILDREN),
            shared: Arc::new(MixerShared {
                inbox: ArrayQueue::new(MAX_CHILDREN),
                active_children: AtomicUsize::new(0),
            }),
            scratch: vec![0.0; max_block_frames.max(1) * 2],
            tap: None,
        }
    }

    /// Master waveform tap, fed after every mix.
    pub fn set_tap(&mut self, tap: WaveformTap) {
        self.tap = Some(tap);
    }

    /// Control-side handle for this mixer; stays valid after the mixer is
    /// installed on the audio thread.
    pub fn handle(&self) -> MixerHandle {
        MixerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Adds a child directly. Only for graph building, before the mixer is
    /// handed to the audio thread; afterwards use [`MixerHandle::add`].
    pub fn add(&mut self, node: Box<dyn RenderNode>) {
        self.children.push(node);
        self.shared
            .active_children
            .store(self.children.len(), Ordering::Relaxed);
    }

    /// Removes all children and drains the inbox.
    pub fn clear(&mut self) {
        self.children.clear();
        while self.shared.inbox.pop().is_some() {}
        self.shared.active_children.store(0, Ordering::Relaxed);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    fn drain_inbox(&mut self) {
        // Bounded by the vec's reserved capacity; anything beyond stays
        // queued for the next callback.
        while self.children.len() < MAX_CHILDREN {
            match self.shared.inbox.pop() {
                Some(node) => self.children.push(node),
                None => break,
            }
        }
    }
}

impl RenderNode for Mixer {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, ctx: RenderContext) {
        self.drain_inbox();

        let out = &mut output[..frames * channels];
        out.fill(0.0);

        if !self.children.is_empty() {
            let chunk_samples = (self.scratch.len() / channels).max(1) * channels;
            for chunk in out.chunks_mut(chunk_samples) {
                let chunk_frames = chunk.len() / channels;
                for child in &mut self.children {
                    let scratch = &mut self.scratch[..chunk.len()];
                    scratch.fill(0.0);
                    child.render(scratch, chunk_frames, channels, ctx);
                    for (dst, src) in chunk.iter_mut().zip(scratch.iter()) {
                        *dst += *src;
                    }
                }
            }
            self.children.retain(|child| !child.is_finished());
        }

        self.shared
            .active_children
            .store(self.children.len(), Ordering::Relaxed);

        if let Some(tap) = &self.tap {
            tap.capture(out);
        }
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
    }

    fn is_finished(&self) -> bool {
        self.children.is_empty()
    }
}

/// Cloneable control-side view of a mixer.
#[derive(Clone)]
pub struct MixerHandle {
    shared: Arc<MixerShared>,
}

impl MixerHandle {
    /// Queues a node for the mixer to pick up at the start of its next
    /// render. `false` when the inbox is full (the node is dropped).
    pub fn add(&self, node: Box<dyn RenderNode>) -> bool {
        self.shared.inbox.push(node).is_ok()
    }

    /// True while the mixer has children or queued additions.
    pub fn is_active(&self) -> bool {
        self.shared.active_children.load(Ordering::Relaxed) > 0 || !self.shared.inbox.is_empty()
    }
}
