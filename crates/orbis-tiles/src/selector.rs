//! Resolve the best available tile for a chunk by falling back to ancestors.

use glam::Vec2;
use orbis_geodetic::ChunkIndex;

use crate::provider::TileProvider;
use crate::tile::{Tile, TileAndTransform, UvTransform};

/// Number of levels resolved per chunk when level blending is enabled.
pub const BLEND_LEVELS: usize = 3;

/// Whether the walk may schedule loads for the tiles it visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lookup {
    Request,
    Cached,
}

/// Step `index` to its parent and fold its position into `transform`.
///
/// # Panics
///
/// Panics if `index` is a root.
fn ascend_to_parent(index: &mut ChunkIndex, transform: &mut UvTransform) {
    let parent = index
        .parent()
        .unwrap_or_else(|| panic!("root index {index} has no parent"));
    transform.offset *= 0.5;
    transform.scale *= 0.5;
    if index.is_east_child() {
        transform.offset.x += 0.5;
    }
    // y in tile uv grows northward while the index row grows southward.
    if index.is_north_child() {
        transform.offset.y += 0.5;
    }
    *index = parent;
}

fn select(
    provider: &dyn TileProvider,
    mut index: ChunkIndex,
    parents: usize,
    lookup: Lookup,
) -> TileAndTransform {
    let mut uv_transform = UvTransform::IDENTITY;
    for _ in 0..parents {
        if index.is_root() {
            break;
        }
        ascend_to_parent(&mut index, &mut uv_transform);
    }
    loop {
        let tile = match lookup {
            Lookup::Request => provider.tile(index),
            Lookup::Cached => provider.cached_tile(index),
        };
        if tile.is_ok() {
            return TileAndTransform { tile, uv_transform };
        }
        if index.is_root() {
            return TileAndTransform {
                tile: Tile::UNAVAILABLE,
                uv_transform: UvTransform::IDENTITY,
            };
        }
        ascend_to_parent(&mut index, &mut uv_transform);
    }
}

/// The highest resolution resident tile covering `index`.
///
/// Requests the exact tile first and walks towards the root until a tile is
/// [`Ok`](crate::TileStatus::Ok). Every visited index is requested from the
/// provider. If even the root has no data the result holds
/// [`Tile::UNAVAILABLE`] with the identity transform.
#[must_use]
pub fn highest_resolution_tile(provider: &dyn TileProvider, index: ChunkIndex) -> TileAndTransform {
    select(provider, index, 0, Lookup::Request)
}

/// Like [`highest_resolution_tile`] but starting `parents` levels above
/// `index` (never above the root).
#[must_use]
pub fn highest_resolution_tile_with_parents(
    provider: &dyn TileProvider,
    index: ChunkIndex,
    parents: usize,
) -> TileAndTransform {
    select(provider, index, parents, Lookup::Request)
}

/// Like [`highest_resolution_tile`] but only consults resident tiles, so no
/// loads are scheduled.
#[must_use]
pub fn highest_resolution_cached_tile(
    provider: &dyn TileProvider,
    index: ChunkIndex,
) -> TileAndTransform {
    select(provider, index, 0, Lookup::Cached)
}

/// Tiles for level blending, in decreasing resolution: searched from
/// `index` itself and from its first and second ancestor.
#[must_use]
pub fn level_blended_tiles(
    provider: &dyn TileProvider,
    index: ChunkIndex,
) -> [TileAndTransform; BLEND_LEVELS] {
    std::array::from_fn(|parents| highest_resolution_tile_with_parents(provider, index, parents))
}

/// Uv of a geodetic offset inside a chunk, measured from the south-west
/// corner and normalized by the chunk size.
#[must_use]
pub fn patch_uv(offset_from_south_west: Vec2, size: Vec2) -> Vec2 {
    offset_from_south_west / size
}
