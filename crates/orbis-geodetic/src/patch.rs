//! Axis-aligned latitude/longitude rectangles.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::chunk_index::ChunkIndex;
use crate::geodetic::{Geodetic2, normalize_around};

/// One of the four quadrants of a patch.
///
/// The discriminant doubles as the child slot: bit 0 set means east,
/// bit 1 set means south.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quad {
    /// North-west quadrant.
    NorthWest = 0,
    /// North-east quadrant.
    NorthEast = 1,
    /// South-west quadrant.
    SouthWest = 2,
    /// South-east quadrant.
    SouthEast = 3,
}

impl Quad {
    /// All quadrants in child-slot order.
    pub const ALL: [Quad; 4] = [
        Quad::NorthWest,
        Quad::NorthEast,
        Quad::SouthWest,
        Quad::SouthEast,
    ];

    /// Quadrant for child slot `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[must_use]
    pub fn from_index(i: usize) -> Self {
        Self::ALL[i]
    }

    /// Child slot of this quadrant.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `true` for the two eastern quadrants.
    #[must_use]
    pub fn is_east(self) -> bool {
        self.index() & 1 == 1
    }

    /// `true` for the two southern quadrants.
    #[must_use]
    pub fn is_south(self) -> bool {
        self.index() & 2 == 2
    }
}

/// A rectangle in latitude/longitude, stored as center and half size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeodeticPatch {
    center: Geodetic2,
    half_size: Geodetic2,
}

impl GeodeticPatch {
    /// Create a patch from its center and half extents, all in radians.
    #[must_use]
    pub const fn new(center_lat: f64, center_lon: f64, half_lat: f64, half_lon: f64) -> Self {
        Self {
            center: Geodetic2::new(center_lat, center_lon),
            half_size: Geodetic2::new(half_lat, half_lon),
        }
    }

    /// Patch covering the whole globe.
    #[must_use]
    pub const fn full_coverage() -> Self {
        Self::new(0.0, 0.0, FRAC_PI_2, PI)
    }

    /// Center of the patch.
    #[must_use]
    pub fn center(&self) -> Geodetic2 {
        self.center
    }

    /// Half extents of the patch.
    #[must_use]
    pub fn half_size(&self) -> Geodetic2 {
        self.half_size
    }

    /// Full extents of the patch.
    #[must_use]
    pub fn size(&self) -> Geodetic2 {
        self.half_size.scale(2.0)
    }

    /// Southern edge latitude.
    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.center.lat - self.half_size.lat
    }

    /// Northern edge latitude.
    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.center.lat + self.half_size.lat
    }

    /// Western edge longitude.
    #[must_use]
    pub fn min_lon(&self) -> f64 {
        self.center.lon - self.half_size.lon
    }

    /// Eastern edge longitude.
    #[must_use]
    pub fn max_lon(&self) -> f64 {
        self.center.lon + self.half_size.lon
    }

    /// Corner point of the patch in the given quadrant.
    #[must_use]
    pub fn corner(&self, quad: Quad) -> Geodetic2 {
        let lat = if quad.is_south() {
            self.min_lat()
        } else {
            self.max_lat()
        };
        let lon = if quad.is_east() {
            self.max_lon()
        } else {
            self.min_lon()
        };
        Geodetic2::new(lat, lon)
    }

    /// The quarter of this patch in the given quadrant.
    #[must_use]
    pub fn quadrant(&self, quad: Quad) -> Self {
        let half = self.half_size.scale(0.5);
        let lat = if quad.is_south() {
            self.center.lat - half.lat
        } else {
            self.center.lat + half.lat
        };
        let lon = if quad.is_east() {
            self.center.lon + half.lon
        } else {
            self.center.lon - half.lon
        };
        Self::new(lat, lon, half.lat, half.lon)
    }

    /// Whether the patch center is north of the equator.
    #[must_use]
    pub fn is_northern(&self) -> bool {
        self.center.lat > 0.0
    }

    /// Latitude of the edge closest to the equator.
    #[must_use]
    pub fn edge_latitude_nearest_equator(&self) -> f64 {
        if self.is_northern() {
            self.min_lat()
        } else {
            self.max_lat()
        }
    }

    /// Whether `point` lies inside the patch, boundaries included.
    ///
    /// Neighbouring patches both contain their shared edge. The owner of an
    /// edge point is the cell [`ChunkIndex::from_geodetic`](crate::ChunkIndex::from_geodetic)
    /// picks: the east and south side of each interior edge.
    #[must_use]
    pub fn contains(&self, point: Geodetic2) -> bool {
        let diff = self.center - point;
        diff.lat.abs() <= self.half_size.lat && diff.lon.abs() <= self.half_size.lon
    }

    /// Corner of the patch closest to `point`, picked by the signs of the
    /// wrapped latitude and longitude offsets from the center.
    #[must_use]
    pub fn closest_corner(&self, point: Geodetic2) -> Geodetic2 {
        let offset = point - self.center;
        let lat_offset = normalize_around(offset.lat, 0.0);
        let lon_offset = normalize_around(offset.lon, 0.0);
        let lat = if lat_offset > 0.0 {
            self.max_lat()
        } else {
            self.min_lat()
        };
        let lon = if lon_offset > 0.0 {
            self.max_lon()
        } else {
            self.min_lon()
        };
        Geodetic2::new(lat, lon)
    }

    /// Point of the patch closest to `point` in great-circle distance.
    ///
    /// Longitude is clamped after wrapping around the patch center. When
    /// `point` is more than a quarter turn of longitude away from the nearest
    /// patch edge, the closest point is found across the pole, so latitude is
    /// mirrored through it before clamping.
    #[must_use]
    pub fn closest_point(&self, point: Geodetic2) -> Geodetic2 {
        let lat = normalize_around(point.lat, self.center.lat);
        let lon = normalize_around(point.lon, self.center.lon);

        let center_to_point_lon = normalize_around(self.center.lon - lon, 0.0);
        let lon_distance_to_edge = center_to_point_lon.abs() - self.half_size.lon;

        let clamped_lat = if lon_distance_to_edge > FRAC_PI_2 {
            normalize_around(PI - lat, self.center.lat).clamp(self.min_lat(), self.max_lat())
        } else {
            lat.clamp(self.min_lat(), self.max_lat())
        };
        let clamped_lon = lon.clamp(self.min_lon(), self.max_lon());
        Geodetic2::new(clamped_lat, clamped_lon)
    }
}

impl From<ChunkIndex> for GeodeticPatch {
    fn from(index: ChunkIndex) -> Self {
        let delta = ChunkIndex::cell_size(index.level);
        let half = delta * 0.5;
        let north = FRAC_PI_2 - delta * f64::from(index.y);
        let west = -PI + delta * f64::from(index.x);
        Self::new(north - half, west + half, half, half)
    }
}
