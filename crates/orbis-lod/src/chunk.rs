//! The payload of one quadtree cell: its patch, height range and bounding
//! polyhedron.

use glam::DVec3;
use orbis_geodetic::{ChunkIndex, Ellipsoid, Geodetic2, Geodetic3, GeodeticPatch, Quad};
use orbis_tiles::{TextureCategory, TileProviderManager, highest_resolution_cached_tile};

/// Height range of a chunk's surface, in meters above the ellipsoid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingHeights {
    /// Lowest surface height.
    pub min: f64,
    /// Highest surface height.
    pub max: f64,
    /// Whether the range came from height data rather than the flat default.
    pub available: bool,
}

impl BoundingHeights {
    /// Height range of `index` from the first active height provider.
    ///
    /// Only resident tiles are consulted. The best ancestor tile's value range
    /// is used, mapped through the provider's depth transform.
    #[must_use]
    pub fn from_tiles(index: ChunkIndex, tiles: &TileProviderManager) -> Self {
        let Some(provider) = tiles.group(TextureCategory::HeightMaps).primary() else {
            return Self::default();
        };
        let resolved = highest_resolution_cached_tile(provider, index);
        match resolved.tile.metadata {
            Some(meta) if resolved.tile.is_ok() => {
                let transform = provider.depth_transform();
                let a = f64::from(transform.apply(meta.min_value));
                let b = f64::from(transform.apply(meta.max_value));
                Self {
                    min: a.min(b),
                    max: a.max(b),
                    available: true,
                }
            }
            _ => Self::default(),
        }
    }
}

/// Eight model-space corners enclosing the curved surface of `patch`
/// between the heights in `heights`.
///
/// Corners `0..4` are the patch corners in [`Quad`] order at the minimum
/// height; `4..8` are the same corners raised far enough that the box also
/// covers the bulge of the patch center at the maximum height. Corners on the
/// edge nearest the equator are pushed towards it so the straight edge
/// encloses the arc.
#[must_use]
pub fn bounding_corners(
    patch: &GeodeticPatch,
    ellipsoid: &Ellipsoid,
    heights: BoundingHeights,
) -> [DVec3; 8] {
    let patch_center_radius = ellipsoid.maximum_radius();
    let max_center_radius = patch_center_radius + heights.max;
    let half = patch.half_size();
    let scale_to_cover_center = (1.0 + half.lat.tan().powi(2) + half.lon.tan().powi(2)).sqrt();
    let max_corner_height = max_center_radius * scale_to_cover_center - patch_center_radius;
    let min_corner_height = heights.min;

    let equator_lat = patch.edge_latitude_nearest_equator();
    let p1 = ellipsoid.cartesian_position(Geodetic3::new(
        Geodetic2::new(equator_lat, patch.min_lon()),
        max_corner_height,
    ));
    let p2 = ellipsoid.cartesian_position(Geodetic3::new(
        Geodetic2::new(equator_lat, patch.max_lon()),
        max_corner_height,
    ));
    let midpoint = ellipsoid.cartesian_to_geodetic2((p1 + p2) * 0.5);
    let lat_shift = equator_lat - midpoint.lat;

    let northern = patch.is_northern();
    std::array::from_fn(|i| {
        let quad = Quad::from_index(i % 4);
        let height = if i < 4 {
            min_corner_height
        } else {
            max_corner_height
        };
        let mut corner = patch.corner(quad);
        if northern == quad.is_south() {
            corner.lat += lat_shift;
        }
        ellipsoid.cartesian_position(Geodetic3::new(corner, height))
    })
}

/// One quadtree cell.
#[derive(Clone, Debug)]
pub struct Chunk {
    index: ChunkIndex,
    surface_patch: GeodeticPatch,
    heights: BoundingHeights,
    corners: [DVec3; 8],
    is_visible: bool,
}

impl Chunk {
    /// A chunk for `index` with flat bounds. New chunks start visible.
    #[must_use]
    pub fn new(index: ChunkIndex, ellipsoid: &Ellipsoid) -> Self {
        let surface_patch = GeodeticPatch::from(index);
        let heights = BoundingHeights::default();
        Self {
            index,
            surface_patch,
            heights,
            corners: bounding_corners(&surface_patch, ellipsoid, heights),
            is_visible: true,
        }
    }

    /// Address of the chunk.
    #[must_use]
    pub fn index(&self) -> ChunkIndex {
        self.index
    }

    /// Level of the chunk.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.index.level
    }

    /// Lat/lon extent of the chunk.
    #[must_use]
    pub fn surface_patch(&self) -> &GeodeticPatch {
        &self.surface_patch
    }

    /// Current height range.
    #[must_use]
    pub fn bounding_heights(&self) -> BoundingHeights {
        self.heights
    }

    /// Model-space bounding polyhedron, see [`bounding_corners`].
    #[must_use]
    pub fn bounding_corners(&self) -> &[DVec3; 8] {
        &self.corners
    }

    /// Whether the last traversal found the chunk visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    /// Re-read the height range from resident tiles and rebuild the corners
    /// if it changed. Returns `true` on change.
    pub fn refresh_bounds(&mut self, ellipsoid: &Ellipsoid, tiles: &TileProviderManager) -> bool {
        let heights = BoundingHeights::from_tiles(self.index, tiles);
        if heights == self.heights {
            return false;
        }
        self.heights = heights;
        self.corners = bounding_corners(&self.surface_patch, ellipsoid, heights);
        true
    }
}
