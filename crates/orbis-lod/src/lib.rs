//! Chunked level-of-detail for a globe.
//!
//! Two quadtrees (west and east hemisphere) are refined every frame: each
//! node is culled against the horizon and the view frustum, given a desired
//! level by a distance or projected-area heuristic capped by the available
//! height data, and split or merged to match. Visible leaves are resolved
//! against the tile providers and handed to a [`ChunkRenderer`].

pub mod camera;
pub mod chunk;
pub mod context;
pub mod culling;
pub mod debug;
pub mod evaluator;
pub mod globe;
pub mod quadtree;
pub mod renderer;
pub mod stats;

pub use camera::{Camera, ModelTransform, Perspective, RenderData, UpdateData};
pub use chunk::{BoundingHeights, Chunk, bounding_corners};
pub use context::TraversalContext;
pub use culling::{Aabb3, ChunkCuller, is_below_horizon};
pub use debug::{DebugBox, DebugBoxKind, chunk_debug_boxes, level_color};
pub use evaluator::{DesiredLevel, LodEvaluator, fused_desired_level};
pub use globe::ChunkedLodGlobe;
pub use quadtree::{ChunkNode, ChunkQuadtree, NodeId, VisibleChunk};
pub use renderer::{ChunkRenderer, LayerTiles, RenderedChunk, ResolvedLayer};
pub use stats::{FrameStats, TraversalStats};
