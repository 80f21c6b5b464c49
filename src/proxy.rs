//! The stable root of the render graph.
//!
//! The audio callback always renders through the proxy. Control threads
//! replace the delegate graph with one lock-free atomic store; a callback
//! in flight finishes with the old graph, the next one sees the new graph,
//! and nothing in between is ever observed.

use crate::render_node::RenderNode;
use crate::types::RenderContext;
use arc_swap::ArcSwapOption;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Newtype wrapper so a `RefCell`'d graph can live inside the `ArcSwap`.
///
/// SAFETY: an installed cell is borrowed exclusively by the audio callback.
/// Control threads build a cell, hand it over with `set_delegate`, and
/// never borrow it again; swapped-out cells are dropped, not reused.
pub struct GraphCell(RefCell<Box<dyn RenderNode>>);

unsafe impl Send for GraphCell {}
unsafe impl Sync for GraphCell {}

impl GraphCell {
    pub fn new(node: Box<dyn RenderNode>) -> Self {
        Self(RefCell::new(node))
    }
}

pub struct Proxy {
    delegate: ArcSwapOption<GraphCell>,
    /// f32 bits; bpm and looping are independent scalars, no consistency
    /// between them is required.
    bpm: AtomicU32,
    is_looping: AtomicBool,
}

impl Proxy {
    pub fn new(initial_bpm: f32, initial_is_looping: bool) -> Self {
        Self {
            delegate: ArcSwapOption::from(None),
            bpm: AtomicU32::new(initial_bpm.to_bits()),
            is_looping: AtomicBool::new(initial_is_looping),
        }
    }

    /// Installs (or with `None` removes) the active graph. Release store;
    /// the audio thread sees either the old graph or the complete new one.
    pub fn set_delegate(&self, cell: Option<Arc<GraphCell>>) {
        self.delegate.store(cell);
    }

    /// Removes and returns the active graph, so the caller (a control
    /// thread) carries the drop cost instead of the audio thread.
    pub fn take_delegate(&self) -> Option<Arc<GraphCell>> {
        self.delegate.swap(None)
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.load().is_some()
    }

    pub fn set_bpm(&self, bpm: f32) {
        self.bpm.store(bpm.to_bits(), Ordering::Relaxed);
    }

    pub fn bpm(&self) -> f32 {
        f32::from_bits(self.bpm.load(Ordering::Relaxed))
    }

    pub fn set_looping(&self, is_looping: bool) {
        self.is_looping.store(is_looping, Ordering::Release);
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping.load(Ordering::Acquire)
    }

    /// One snapshot per callback; every node in the tree sees the same
    /// context.
    pub fn context(&self) -> RenderContext {
        RenderContext {
            is_looping: self.is_looping(),
            bpm: self.bpm(),
        }
    }

    /// Audio-thread entry point. Loads the delegate once (acquire) and
    /// forwards; with no delegate installed the output is silence.
    pub fn render(&self, output: &mut [f32], frames: usize, channels: usize) {
        let guard = self.delegate.load();
        match guard.as_ref() {
            Some(cell) => {
                let ctx = self.context();
                cell.0.borrow_mut().render(output, frames, channels, ctx);
            }
            None => output[..frames * channels].fill(0.0),
        }
    }
}
