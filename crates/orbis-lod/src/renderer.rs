//! The contract between the globe and whatever draws it.

use orbis_geodetic::{ChunkIndex, GeodeticPatch};
use orbis_tiles::{BLEND_LEVELS, DepthTransform, TextureCategory, TileAndTransform};

use crate::camera::{Camera, RenderData};
use crate::debug::DebugBox;

/// Tiles resolved from one provider for one chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LayerTiles {
    /// The best available tile.
    Single(TileAndTransform),
    /// Tiles searched from the chunk and its first two ancestors, in
    /// decreasing resolution.
    Blended([TileAndTransform; BLEND_LEVELS]),
}

/// One texture layer of a rendered chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedLayer {
    /// Category of the provider.
    pub category: TextureCategory,
    /// Position of the provider in its group.
    pub provider_index: usize,
    /// Texel-to-meters mapping of the provider.
    pub depth_transform: DepthTransform,
    /// The resolved tiles.
    pub tiles: LayerTiles,
}

/// A visible leaf with its textures.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedChunk {
    /// Address of the leaf.
    pub index: ChunkIndex,
    /// Lat/lon extent of the leaf.
    pub patch: GeodeticPatch,
    /// Every active provider's tiles, in category order.
    pub layers: Vec<ResolvedLayer>,
}

impl RenderedChunk {
    /// Layers of one category.
    pub fn layers_of(&self, category: TextureCategory) -> impl Iterator<Item = &ResolvedLayer> + '_ {
        self.layers.iter().filter(move |l| l.category == category)
    }
}

/// Consumer of the globe's per-frame output.
pub trait ChunkRenderer {
    /// Called from the globe's update step.
    fn update(&mut self) {}

    /// Draw one visible chunk.
    fn render_chunk(&mut self, chunk: &RenderedChunk, data: &RenderData);

    /// Draw one debug box.
    fn render_debug_box(&mut self, _debug_box: &DebugBox) {}

    /// Draw the frustum of a saved camera.
    fn render_camera_frustum(&mut self, _camera: &Camera, _data: &RenderData) {}
}
