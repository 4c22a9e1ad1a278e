//! Counters reported by traversals and frames.

use serde::Serialize;

/// What one quadtree update did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    /// Nodes visited.
    pub evaluated: usize,
    /// Visited nodes rejected by a culler.
    pub culled: usize,
    /// Leaves split into four children.
    pub splits: usize,
    /// Subtrees collapsed into a leaf.
    pub merges: usize,
}

/// Summary of one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Frame counter, starting at 1.
    pub frame: u64,
    /// Nodes in both quadtrees.
    pub chunk_nodes: usize,
    /// Leaves in both quadtrees.
    pub leaves: usize,
    /// Visible leaves handed to the renderer.
    pub rendered: usize,
    /// Leaves skipped as culled.
    pub culled: usize,
    /// Splits performed this frame.
    pub splits: usize,
    /// Merges performed this frame.
    pub merges: usize,
    /// Deepest level among rendered leaves.
    pub max_rendered_level: u8,
}
