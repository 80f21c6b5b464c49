//! The single capability implemented by every audio-producing node.

use crate::types::RenderContext;

/// An audio-producing node in the render graph.
///
/// `render` is invoked exclusively from the audio thread and must fill
/// `frames * channels` interleaved floats in `output` without allocating,
/// locking, or blocking. Leaf voices overwrite the scratch they are given;
/// compositional nodes zero their children's scratch and mix additively.
///
/// Nodes are `Send`: a graph is built on a control thread and handed to the
/// audio thread through an atomic swap.
pub trait RenderNode: Send {
    fn render(&mut self, output: &mut [f32], frames: usize, channels: usize, ctx: RenderContext);

    /// Restores the node to its initial playback state.
    fn reset(&mut self);

    /// True once no further nontrivial output will be produced without a
    /// `reset`.
    fn is_finished(&self) -> bool;
}
