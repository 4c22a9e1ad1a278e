//! Tile data plumbing for the globe: the provider contract, per-category
//! provider groups, ancestor-fallback tile selection, and two reference
//! providers (in-memory tables and a background-loading pool).

mod async_provider;
mod error;
mod memory;
mod provider;
pub mod selector;
mod tile;

pub use async_provider::{AsyncTileProvider, TileSource};
pub use error::TileError;
pub use memory::{MemoryTileProvider, TexelGrid};
pub use provider::{
    NamedTileProvider, TextureCategory, TileProvider, TileProviderGroup, TileProviderManager,
};
pub use selector::{
    BLEND_LEVELS, highest_resolution_cached_tile, highest_resolution_tile,
    highest_resolution_tile_with_parents, level_blended_tiles,
};
pub use tile::{
    DepthTransform, TextureHandle, Tile, TileAndTransform, TileMetadata, TileStatus, UvTransform,
};
