//! The globe driver: one split/merge pass, visible-leaf collection and tile
//! resolution per frame.

use glam::{DMat4, DVec3, Vec2};
use orbis_config::LodConfig;
use orbis_geodetic::{ChunkIndex, Ellipsoid, Geodetic2, GeodeticPatch, Quad};
use orbis_tiles::selector::patch_uv;
use orbis_tiles::{
    TextureCategory, TextureHandle, TileProvider, TileProviderManager, highest_resolution_tile,
    level_blended_tiles,
};
use tracing::{debug, info};

use crate::camera::{Camera, RenderData, UpdateData};
use crate::chunk::Chunk;
use crate::context::TraversalContext;
use crate::culling::{Aabb3, ChunkCuller};
use crate::debug::chunk_debug_boxes;
use crate::quadtree::ChunkQuadtree;
use crate::renderer::{ChunkRenderer, LayerTiles, RenderedChunk, ResolvedLayer};
use crate::stats::FrameStats;

/// A globe rendered as two adaptive quadtrees of chunks.
pub struct ChunkedLodGlobe<R: ChunkRenderer> {
    ellipsoid: Ellipsoid,
    quadtree: ChunkQuadtree,
    tiles: TileProviderManager,
    renderer: R,
    cullers: Vec<ChunkCuller>,
    model_transform: DMat4,
    inverse_model_transform: DMat4,
    saved_camera: Option<Camera>,
    frame: u64,
    last_stats: FrameStats,
}

impl<R: ChunkRenderer> ChunkedLodGlobe<R> {
    /// A globe at the origin with horizon and frustum culling.
    pub fn new(ellipsoid: Ellipsoid, tiles: TileProviderManager, renderer: R) -> Self {
        info!(radii = ?ellipsoid.radii(), "created chunked globe");
        Self {
            quadtree: ChunkQuadtree::new(&ellipsoid),
            ellipsoid,
            tiles,
            renderer,
            cullers: ChunkCuller::defaults(),
            model_transform: DMat4::IDENTITY,
            inverse_model_transform: DMat4::IDENTITY,
            saved_camera: None,
            frame: 0,
            last_stats: FrameStats::default(),
        }
    }

    /// Replace the culling strategies.
    pub fn set_cullers(&mut self, cullers: Vec<ChunkCuller>) {
        self.cullers = cullers;
    }

    /// Change the volume the frustum culler tests against.
    pub fn set_frustum_view_volume(&mut self, volume: Aabb3) {
        for culler in &mut self.cullers {
            if let ChunkCuller::Frustum { view_volume } = culler {
                *view_volume = volume;
            }
        }
    }

    /// Reference surface.
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Both quadtrees.
    pub fn quadtree(&self) -> &ChunkQuadtree {
        &self.quadtree
    }

    /// Tile sources.
    pub fn tiles(&self) -> &TileProviderManager {
        &self.tiles
    }

    /// Mutable tile sources, for registering providers or toggling them.
    pub fn tiles_mut(&mut self) -> &mut TileProviderManager {
        &mut self.tiles
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable renderer.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Counters of the last rendered frame.
    pub fn stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Cache the model transform and let providers and renderer integrate
    /// finished work.
    pub fn update(&mut self, data: &UpdateData) {
        self.model_transform = data.model_transform.matrix();
        self.inverse_model_transform = self.model_transform.inverse();
        self.tiles.update();
        self.renderer.update();
    }

    /// Refine the trees for `data.camera` (or the saved camera) and submit
    /// every visible leaf to the renderer.
    pub fn render(&mut self, data: &RenderData, config: &LodConfig) -> FrameStats {
        debug_assert!(
            config.min_split_depth <= config.max_split_depth,
            "min split depth above max"
        );
        self.frame += 1;
        let lod_camera = self.saved_camera.unwrap_or(data.camera);
        let ctx = TraversalContext::new(
            &self.ellipsoid,
            &self.tiles,
            config,
            &lod_camera,
            &self.cullers,
            self.model_transform,
            self.inverse_model_transform,
        );
        let traversal = self.quadtree.update(&ctx);
        let visible = self.quadtree.visible_leaves();

        let model_view_projection = data.camera.view_projection_matrix() * self.model_transform;
        let show_debug = config.show_chunk_bounds || config.show_chunk_aabb;
        let mut max_rendered_level = 0;
        for leaf in &visible {
            let chunk = RenderedChunk {
                index: leaf.index,
                patch: leaf.patch,
                layers: resolve_layers(&self.tiles, leaf.index),
            };
            self.renderer.render_chunk(&chunk, data);
            max_rendered_level = max_rendered_level.max(leaf.index.level);
            if show_debug {
                let node = self.quadtree.node(leaf.id);
                for debug_box in chunk_debug_boxes(node.chunk(), model_view_projection, config) {
                    self.renderer.render_debug_box(&debug_box);
                }
            }
        }
        if let Some(saved) = &self.saved_camera {
            self.renderer.render_camera_frustum(saved, data);
        }

        let leaves = self.quadtree.leaf_count();
        let stats = FrameStats {
            frame: self.frame,
            chunk_nodes: self.quadtree.node_count(),
            leaves,
            rendered: visible.len(),
            culled: leaves - visible.len(),
            splits: traversal.splits,
            merges: traversal.merges,
            max_rendered_level,
        };
        debug!(
            frame = stats.frame,
            nodes = stats.chunk_nodes,
            rendered = stats.rendered,
            splits = stats.splits,
            merges = stats.merges,
            "rendered globe"
        );
        self.last_stats = stats;
        stats
    }

    /// The leaf chunk containing `point`.
    pub fn find_chunk(&self, point: Geodetic2) -> &Chunk {
        self.quadtree.node(self.quadtree.find(point)).chunk()
    }

    /// Terrain height in meters below the model-space `position`.
    ///
    /// Samples the best tile of the first active height provider for the
    /// leaf under `position`, bilinearly, through the tile's uv transform and
    /// the provider's depth transform. Returns 0 when no height data exists.
    pub fn height_at(&self, position: DVec3) -> f64 {
        let Some(provider) = self.tiles.group(TextureCategory::HeightMaps).primary() else {
            return 0.0;
        };
        let geodetic = self.ellipsoid.cartesian_to_geodetic2(position);
        let index = self.find_chunk(geodetic).index();
        let patch = GeodeticPatch::from(index);
        let offset = geodetic - patch.corner(Quad::SouthWest);
        let size = patch.size();
        let uv = patch_uv(
            Vec2::new(offset.lon as f32, offset.lat as f32),
            Vec2::new(size.lon as f32, size.lat as f32),
        );

        let resolved = highest_resolution_tile(provider, index);
        let Some(texture) = resolved.tile.texture.filter(|_| resolved.tile.is_ok()) else {
            return 0.0;
        };
        let uv = resolved.uv_transform.apply(uv);
        let sample = uv * Vec2::new(texture.width as f32, texture.height as f32);
        match sample_bilinear(provider, texture, sample) {
            Some(value) => f64::from(provider.depth_transform().apply(value)),
            None => 0.0,
        }
    }

    /// Freeze culling and level selection at `camera`.
    pub fn save_camera(&mut self, camera: Camera) {
        info!("saved camera for culling");
        self.saved_camera = Some(camera);
    }

    /// Resume culling and level selection with the live camera.
    pub fn discard_saved_camera(&mut self) {
        if self.saved_camera.take().is_some() {
            info!("discarded saved camera");
        }
    }

    /// Save `camera` if none is saved, otherwise discard the saved one.
    pub fn toggle_saved_camera(&mut self, camera: &Camera) {
        if self.saved_camera.is_some() {
            self.discard_saved_camera();
        } else {
            self.save_camera(*camera);
        }
    }

    /// The saved camera, if any.
    pub fn saved_camera(&self) -> Option<&Camera> {
        self.saved_camera.as_ref()
    }

    /// Drop every provider's cached tiles.
    pub fn reset_tile_providers(&mut self) {
        self.tiles.reset();
    }
}

/// Tiles of every active provider for `index`, in category order.
fn resolve_layers(tiles: &TileProviderManager, index: ChunkIndex) -> Vec<ResolvedLayer> {
    let mut layers = Vec::new();
    for group in tiles.groups() {
        let blend = group.level_blending_enabled();
        for (provider_index, named) in group.providers().iter().enumerate() {
            if !named.is_active {
                continue;
            }
            let provider = named.provider.as_ref();
            let resolved = if blend {
                LayerTiles::Blended(level_blended_tiles(provider, index))
            } else {
                LayerTiles::Single(highest_resolution_tile(provider, index))
            };
            layers.push(ResolvedLayer {
                category: group.category(),
                provider_index,
                depth_transform: provider.depth_transform(),
                tiles: resolved,
            });
        }
    }
    layers
}

fn clamp_texel(coordinate: f32, max: u32) -> u32 {
    (coordinate.max(0.0) as u32).min(max)
}

/// Bilinear sample at texel-space `sample`, clamping to the texture edge.
fn sample_bilinear(
    provider: &dyn TileProvider,
    texture: TextureHandle,
    sample: Vec2,
) -> Option<f32> {
    let max_x = texture.width.checked_sub(1)?;
    let max_y = texture.height.checked_sub(1)?;
    let floor = sample.floor();
    let t = sample - floor;
    let x0 = clamp_texel(floor.x, max_x);
    let x1 = clamp_texel(floor.x + 1.0, max_x);
    let y0 = clamp_texel(floor.y, max_y);
    let y1 = clamp_texel(floor.y + 1.0, max_y);

    let south = lerp(provider.texel(texture, x0, y0)?, provider.texel(texture, x1, y0)?, t.x);
    let north = lerp(provider.texel(texture, x0, y1)?, provider.texel(texture, x1, y1)?, t.x);
    Some(lerp(south, north, t.y))
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
