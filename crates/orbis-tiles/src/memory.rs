//! A synchronous provider backed by in-memory tables.

use std::sync::atomic::{AtomicUsize, Ordering};

use orbis_geodetic::ChunkIndex;
use rustc_hash::FxHashMap;

use crate::provider::TileProvider;
use crate::tile::{DepthTransform, TextureHandle, Tile, TileMetadata};

/// Row-major texels of one texture.
#[derive(Clone, Debug, PartialEq)]
pub struct TexelGrid {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// `width * height` values, row-major with row 0 at the south edge (uv y = 0).
    pub values: Vec<f32>,
}

impl TexelGrid {
    /// Create a grid.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != width * height`.
    #[must_use]
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Self {
        assert_eq!(
            values.len(),
            (width as usize) * (height as usize),
            "texel count does not match {width}x{height}"
        );
        Self {
            width,
            height,
            values,
        }
    }

    /// Value at `(x, y)`, `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Smallest and largest value.
    #[must_use]
    pub fn metadata(&self) -> Option<TileMetadata> {
        let mut values = self.values.iter().copied();
        let first = values.next()?;
        let (min_value, max_value) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(TileMetadata {
            min_value,
            max_value,
        })
    }
}

/// Serves tiles from explicit tables, with an optional blanket coverage
/// down to a fixed level.
///
/// Lookups through [`TileProvider::tile`] are counted so tests can check
/// which paths schedule loads.
#[derive(Debug, Default)]
pub struct MemoryTileProvider {
    tiles: FxHashMap<ChunkIndex, Tile>,
    texels: FxHashMap<u64, TexelGrid>,
    coverage: Option<(u8, Tile)>,
    depth_transform: DepthTransform,
    requests: AtomicUsize,
}

impl MemoryTileProvider {
    /// An empty provider: every lookup is unavailable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `tile` for every index at or above `max_level` that has no
    /// explicit entry.
    #[must_use]
    pub fn with_coverage(mut self, max_level: u8, tile: Tile) -> Self {
        self.coverage = Some((max_level, tile));
        self
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with_tile(mut self, index: ChunkIndex, tile: Tile) -> Self {
        self.insert(index, tile);
        self
    }

    /// Register CPU-side texels for a texture handle.
    #[must_use]
    pub fn with_texels(mut self, texture: TextureHandle, grid: TexelGrid) -> Self {
        self.texels.insert(texture.id, grid);
        self
    }

    /// Set the texel-to-meters mapping.
    #[must_use]
    pub fn with_depth_transform(mut self, depth_transform: DepthTransform) -> Self {
        self.depth_transform = depth_transform;
        self
    }

    /// Set the tile for an exact index.
    pub fn insert(&mut self, index: ChunkIndex, tile: Tile) {
        self.tiles.insert(index, tile);
    }

    /// Number of loading lookups served so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn lookup(&self, index: ChunkIndex) -> Tile {
        if let Some(tile) = self.tiles.get(&index) {
            return *tile;
        }
        match self.coverage {
            Some((max_level, tile)) if index.level <= max_level => tile,
            _ => Tile::UNAVAILABLE,
        }
    }
}

impl TileProvider for MemoryTileProvider {
    fn tile(&self, index: ChunkIndex) -> Tile {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.lookup(index)
    }

    fn cached_tile(&self, index: ChunkIndex) -> Tile {
        self.lookup(index)
    }

    fn depth_transform(&self) -> DepthTransform {
        self.depth_transform
    }

    fn texel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<f32> {
        self.texels.get(&texture.id)?.get(x, y)
    }

    fn reset(&mut self) {
        self.requests.store(0, Ordering::Relaxed);
    }
}
