//! Tiles, their load status and the transforms that map them onto chunks.

use glam::Vec2;

/// Load state of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// The provider has no data for this index.
    Unavailable,
    /// A load has been scheduled and has not finished.
    Loading,
    /// The texture is resident and usable.
    Ok,
}

/// Opaque reference to a resident texture owned by a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    /// Provider-assigned identifier.
    pub id: u64,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

/// Value range of a tile, computed by the provider when the tile is loaded.
///
/// For height maps these are raw texel values, before the provider's
/// [`DepthTransform`] is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMetadata {
    /// Smallest texel value.
    pub min_value: f32,
    /// Largest texel value.
    pub max_value: f32,
}

/// One streamed texture unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    /// Load state.
    pub status: TileStatus,
    /// The texture, present when `status` is [`TileStatus::Ok`].
    pub texture: Option<TextureHandle>,
    /// Optional value range.
    pub metadata: Option<TileMetadata>,
}

impl Tile {
    /// A tile with no data.
    pub const UNAVAILABLE: Tile = Tile {
        status: TileStatus::Unavailable,
        texture: None,
        metadata: None,
    };

    /// A tile whose load is in progress.
    pub const LOADING: Tile = Tile {
        status: TileStatus::Loading,
        texture: None,
        metadata: None,
    };

    /// A resident tile.
    #[must_use]
    pub fn ok(texture: TextureHandle, metadata: Option<TileMetadata>) -> Self {
        Self {
            status: TileStatus::Ok,
            texture: Some(texture),
            metadata,
        }
    }

    /// Whether the tile can be bound.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == TileStatus::Ok && self.texture.is_some()
    }
}

/// Maps raw height texels to meters: `offset + scale * texel`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthTransform {
    /// Added after scaling.
    pub offset: f32,
    /// Multiplies the raw texel.
    pub scale: f32,
}

impl DepthTransform {
    /// Texels are already in meters.
    pub const IDENTITY: DepthTransform = DepthTransform {
        offset: 0.0,
        scale: 1.0,
    };

    /// Apply the transform to a raw value.
    #[must_use]
    pub fn apply(&self, texel: f32) -> f32 {
        self.offset + self.scale * texel
    }
}

impl Default for DepthTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Maps a chunk's own `[0,1]^2` uv into the uv space of an ancestor tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvTransform {
    /// Position of the chunk's uv origin inside the tile.
    pub offset: Vec2,
    /// Fraction of the tile the chunk spans on each axis.
    pub scale: Vec2,
}

impl UvTransform {
    /// The tile belongs to the chunk itself.
    pub const IDENTITY: UvTransform = UvTransform {
        offset: Vec2::ZERO,
        scale: Vec2::ONE,
    };

    /// Tile uv of a chunk uv.
    #[must_use]
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        self.offset + self.scale * uv
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A tile and where the requesting chunk sits inside it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileAndTransform {
    /// The resolved tile, [`Tile::UNAVAILABLE`] if no ancestor had data.
    pub tile: Tile,
    /// Chunk-to-tile uv mapping.
    pub uv_transform: UvTransform,
}
