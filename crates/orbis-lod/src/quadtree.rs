//! Arena-backed quadtrees over the two hemisphere roots, and the per-frame
//! split/merge pass.

use std::collections::VecDeque;

use orbis_geodetic::{ChunkIndex, Ellipsoid, Geodetic2, GeodeticPatch, Hemisphere};
use tracing::trace;

use crate::chunk::Chunk;
use crate::context::TraversalContext;
use crate::evaluator::fused_desired_level;
use crate::stats::TraversalStats;

/// Stable handle of a node in a [`ChunkQuadtree`].
///
/// Ids of merged-away nodes are recycled by later splits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn slot(self) -> usize {
        self.0 as usize
    }
}

/// A quadtree vertex: a leaf, or a parent with exactly four children.
#[derive(Clone, Debug)]
pub struct ChunkNode {
    chunk: Chunk,
    children: Option<[NodeId; 4]>,
}

impl ChunkNode {
    /// The chunk this node covers.
    #[must_use]
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// Whether the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Children in [`Quad`](orbis_geodetic::Quad) order, if split.
    #[must_use]
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.children
    }
}

/// A visible leaf collected for rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleChunk {
    /// Node of the leaf.
    pub id: NodeId,
    /// Address of the leaf.
    pub index: ChunkIndex,
    /// Lat/lon extent of the leaf.
    pub patch: GeodeticPatch,
}

/// The west and east quadtrees, sharing one node arena.
#[derive(Clone, Debug)]
pub struct ChunkQuadtree {
    slots: Vec<Option<ChunkNode>>,
    free: Vec<NodeId>,
    roots: [NodeId; 2],
}

impl ChunkQuadtree {
    /// Two root leaves, one per hemisphere.
    #[must_use]
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            roots: [NodeId(0), NodeId(1)],
        };
        let roots = Hemisphere::ALL.map(|h| tree.allocate(Chunk::new(h.root_index(), ellipsoid)));
        tree.roots = roots;
        tree
    }

    /// Root node of `hemisphere`.
    #[must_use]
    pub fn root(&self, hemisphere: Hemisphere) -> NodeId {
        self.roots[hemisphere.id()]
    }

    /// Node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a node that has been merged away.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ChunkNode {
        self.slots
            .get(id.slot())
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("stale node id {id:?}"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ChunkNode {
        self.slots
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("stale node id {id:?}"))
    }

    /// Live nodes in both trees.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Leaves in both trees.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.slots.iter().flatten().filter(|n| n.is_leaf()).count()
    }

    fn allocate(&mut self, chunk: Chunk) -> NodeId {
        let node = ChunkNode {
            chunk,
            children: None,
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id.slot()] = Some(node);
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Some(node));
                id
            }
        }
    }

    /// Give the leaf `id` four leaf children and return them.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a leaf or is already at the deepest level.
    pub fn split(&mut self, id: NodeId, ellipsoid: &Ellipsoid) -> [NodeId; 4] {
        let node = self.node(id);
        assert!(node.is_leaf(), "split of non-leaf {}", node.chunk.index());
        let children = node
            .chunk
            .index()
            .children()
            .map(|index| self.allocate(Chunk::new(index, ellipsoid)));
        self.node_mut(id).children = Some(children);
        children
    }

    /// Discard every descendant of `id`, making it a leaf. No-op on a leaf.
    pub fn merge(&mut self, id: NodeId) {
        let Some(children) = self.node_mut(id).children.take() else {
            return;
        };
        let mut pending = children.to_vec();
        while let Some(child) = pending.pop() {
            if let Some(node) = self.slots[child.slot()].take() {
                pending.extend(node.children.into_iter().flatten());
                self.free.push(child);
            }
        }
    }

    /// Leaf containing `point`.
    ///
    /// Points on a shared edge resolve to the single leaf whose index
    /// [`ChunkIndex::from_geodetic`] gives at that leaf's level.
    ///
    /// # Panics
    ///
    /// Panics if `point` is outside the geodetic domain.
    #[must_use]
    pub fn find(&self, point: Geodetic2) -> NodeId {
        let mut id = self.root(Hemisphere::containing(point));
        while let Some(children) = self.node(id).children {
            let level = self.node(id).chunk.level() + 1;
            let quad = ChunkIndex::from_geodetic(point, level).quad();
            id = children[quad.index()];
        }
        id
    }

    /// Nodes under `root` (inclusive), deepest level first.
    #[must_use]
    pub fn reverse_breadth_first(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(children) = self.node(id).children {
                queue.extend(children);
            }
        }
        order.reverse();
        order
    }

    /// Visible leaves of the west then the east tree, each deepest first.
    #[must_use]
    pub fn visible_leaves(&self) -> Vec<VisibleChunk> {
        Hemisphere::ALL
            .iter()
            .flat_map(|&h| self.reverse_breadth_first(self.root(h)))
            .filter_map(|id| {
                let node = self.node(id);
                (node.is_leaf() && node.chunk.is_visible()).then(|| VisibleChunk {
                    id,
                    index: node.chunk.index(),
                    patch: *node.chunk.surface_patch(),
                })
            })
            .collect()
    }

    /// One top-down split/merge pass over both trees.
    ///
    /// Each visited node refreshes its bounds, is tested by the cullers and
    /// gets a desired level. Culled nodes are pinned to the minimum split
    /// depth unless the config asks to expand them. New children are visited
    /// in the same pass; merged subtrees are not.
    pub fn update(&mut self, ctx: &TraversalContext<'_>) -> TraversalStats {
        let mut stats = TraversalStats::default();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            stats.evaluated += 1;
            let node = self.node_mut(id);
            node.chunk.refresh_bounds(ctx.ellipsoid, ctx.tiles);
            let cullable = ctx.is_cullable(&node.chunk);
            node.chunk.set_visible(!cullable);
            if cullable {
                stats.culled += 1;
            }
            let desired = if cullable && !ctx.config.expand_culled_subtrees {
                ctx.config.min_split_depth
            } else {
                fused_desired_level(&node.chunk, ctx)
            };
            let index = node.chunk.index();
            let children = node.children;

            match children {
                None if desired > index.level && index.level < ChunkIndex::MAX_LEVEL => {
                    trace!(%index, desired, "split");
                    let children = self.split(id, ctx.ellipsoid);
                    stats.splits += 1;
                    stack.extend(children.iter().rev());
                }
                None => {}
                Some(_) if desired <= index.level => {
                    trace!(%index, desired, "merge");
                    self.merge(id);
                    stats.merges += 1;
                }
                Some(children) => stack.extend(children.iter().rev()),
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use orbis_geodetic::Quad;

    use super::*;

    fn tree() -> (ChunkQuadtree, Ellipsoid) {
        let ellipsoid = Ellipsoid::sphere(1000.0);
        (ChunkQuadtree::new(&ellipsoid), ellipsoid)
    }

    #[test]
    fn test_new_tree_has_two_root_leaves() {
        let (tree, _) = tree();
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.leaf_count(), 2);
        for h in Hemisphere::ALL {
            assert_eq!(tree.node(tree.root(h)).chunk().index(), h.root_index());
        }
    }

    #[test]
    fn test_split_creates_quadrant_children() {
        let (mut tree, ellipsoid) = tree();
        let root = tree.root(Hemisphere::East);
        let children = tree.split(root, &ellipsoid);
        assert!(!tree.node(root).is_leaf());
        assert_eq!(tree.node_count(), 6);
        assert_eq!(tree.leaf_count(), 5);
        for (quad, id) in Quad::ALL.into_iter().zip(children) {
            let expected = tree.node(root).chunk().index().child(quad);
            assert_eq!(tree.node(id).chunk().index(), expected);
        }
    }

    #[test]
    #[should_panic(expected = "split of non-leaf")]
    fn test_split_twice_panics() {
        let (mut tree, ellipsoid) = tree();
        let root = tree.root(Hemisphere::West);
        let _ = tree.split(root, &ellipsoid);
        let _ = tree.split(root, &ellipsoid);
    }

    #[test]
    fn test_merge_frees_subtree_and_recycles_ids() {
        let (mut tree, ellipsoid) = tree();
        let root = tree.root(Hemisphere::West);
        let children = tree.split(root, &ellipsoid);
        let _ = tree.split(children[2], &ellipsoid);
        assert_eq!(tree.node_count(), 10);

        tree.merge(root);
        assert!(tree.node(root).is_leaf());
        assert_eq!(tree.node_count(), 2);

        let again = tree.split(root, &ellipsoid);
        assert_eq!(tree.slots.len(), 10);
        for id in again {
            assert!(tree.node(id).is_leaf());
        }
        // Merging a leaf is a no-op.
        tree.merge(again[0]);
        assert_eq!(tree.node_count(), 6);
    }

    #[test]
    fn test_find_descends_to_leaf() {
        let (mut tree, ellipsoid) = tree();
        let point = Geodetic2::from_degrees(-30.0, 100.0);
        let mut id = tree.root(Hemisphere::East);
        for _ in 0..4 {
            let children = tree.split(id, &ellipsoid);
            let level = tree.node(id).chunk().level() + 1;
            let quad = ChunkIndex::from_geodetic(point, level).quad();
            id = children[quad.index()];
        }
        let found = tree.find(point);
        assert_eq!(found, id);
        assert!(tree.node(found).chunk().surface_patch().contains(point));
        assert_eq!(tree.node(found).chunk().level(), 5);

        // A point in the other hemisphere stops at its root.
        let west = tree.find(Geodetic2::from_degrees(10.0, -10.0));
        assert_eq!(west, tree.root(Hemisphere::West));
    }

    #[test]
    fn test_reverse_breadth_first_is_deepest_first() {
        let (mut tree, ellipsoid) = tree();
        let root = tree.root(Hemisphere::West);
        let children = tree.split(root, &ellipsoid);
        let grandchildren = tree.split(children[1], &ellipsoid);

        let order = tree.reverse_breadth_first(root);
        assert_eq!(order.len(), 9);
        assert_eq!(order[0], grandchildren[3]);
        assert_eq!(*order.last().unwrap(), root);
        let levels: Vec<u8> = order.iter().map(|&id| tree.node(id).chunk().level()).collect();
        assert!(levels.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_visible_leaves_order_and_filter() {
        let (mut tree, ellipsoid) = tree();
        let west = tree.root(Hemisphere::West);
        let east = tree.root(Hemisphere::East);
        let west_children = tree.split(west, &ellipsoid);
        let _ = tree.split(east, &ellipsoid);
        tree.node_mut(west_children[0]).chunk.set_visible(false);

        let visible = tree.visible_leaves();
        assert_eq!(visible.len(), 7);
        assert!(visible[..3].iter().all(|v| v.index.hemisphere() == Hemisphere::West));
        assert!(visible[3..].iter().all(|v| v.index.hemisphere() == Hemisphere::East));
        assert!(visible.iter().all(|v| v.id != west_children[0]));
        assert_eq!(visible[0].patch, GeodeticPatch::from(visible[0].index));
    }
}
