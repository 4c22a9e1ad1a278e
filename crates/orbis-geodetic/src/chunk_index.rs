//! Addresses of cells in the two hemisphere quadtrees.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::geodetic::Geodetic2;
use crate::patch::{GeodeticPatch, Quad};

/// The two independent root trees of the globe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hemisphere {
    /// Longitudes west of the coverage center.
    West = 0,
    /// Longitudes east of the coverage center.
    East = 1,
}

impl Hemisphere {
    /// Both hemispheres, west first.
    pub const ALL: [Hemisphere; 2] = [Hemisphere::West, Hemisphere::East];

    /// Root id (0 for west, 1 for east).
    #[must_use]
    pub fn id(self) -> usize {
        self as usize
    }

    /// Index of this hemisphere's root cell.
    #[must_use]
    pub fn root_index(self) -> ChunkIndex {
        ChunkIndex::new(self as u32, 0, ChunkIndex::ROOT_LEVEL)
    }

    /// Hemisphere whose root contains `point`.
    ///
    /// # Panics
    ///
    /// Panics if `point` lies outside the globe coverage.
    #[must_use]
    pub fn containing(point: Geodetic2) -> Self {
        let coverage = GeodeticPatch::full_coverage();
        assert!(
            coverage.contains(point),
            "point ({}, {}) is outside the geodetic domain",
            point.lat,
            point.lon
        );
        if point.lon < coverage.center().lon {
            Hemisphere::West
        } else {
            Hemisphere::East
        }
    }
}

/// Address of a quadtree cell.
///
/// Levels are absolute: at level `L` the globe is split into `2^L` columns of
/// longitude and `2^(L-1)` rows of latitude, each cell spanning
/// `2*pi / 2^L` radians on both axes. Level 1 contains the two hemisphere
/// roots. `x` grows eastward from the antimeridian and `y` southward from
/// the north pole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkIndex {
    /// Column, counted eastward from longitude -180 deg.
    pub x: u32,
    /// Row, counted southward from latitude 90 deg.
    pub y: u32,
    /// Subdivision level.
    pub level: u8,
}

impl ChunkIndex {
    /// Level of the hemisphere roots.
    pub const ROOT_LEVEL: u8 = 1;

    /// Deepest addressable level.
    pub const MAX_LEVEL: u8 = 30;

    /// Construct an index, validating its coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `level` is outside `[ROOT_LEVEL, MAX_LEVEL]` or `x`/`y` are
    /// off the grid for that level.
    #[must_use]
    pub fn new(x: u32, y: u32, level: u8) -> Self {
        let (columns, rows) = Self::grid_size(level);
        assert!(x < columns, "x={x} out of range for level {level} (max {columns})");
        assert!(y < rows, "y={y} out of range for level {level} (max {rows})");
        Self { x, y, level }
    }

    /// `(columns, rows)` of the global grid at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is outside `[ROOT_LEVEL, MAX_LEVEL]`.
    #[must_use]
    pub fn grid_size(level: u8) -> (u32, u32) {
        assert!(
            (Self::ROOT_LEVEL..=Self::MAX_LEVEL).contains(&level),
            "level {level} outside [{}, {}]",
            Self::ROOT_LEVEL,
            Self::MAX_LEVEL
        );
        (1 << level, 1 << (level - 1))
    }

    /// Angular size in radians of one cell at `level`, on both axes.
    #[must_use]
    pub fn cell_size(level: u8) -> f64 {
        TAU / f64::from(1u32 << level)
    }

    /// Cell containing `point` at `level`.
    ///
    /// Points on the eastern or southern boundary of the globe are clamped
    /// into the last column or row.
    ///
    /// # Panics
    ///
    /// Panics if `point` is outside the geodetic domain or `level` is invalid.
    #[must_use]
    pub fn from_geodetic(point: Geodetic2, level: u8) -> Self {
        assert!(
            point.is_valid(),
            "point ({}, {}) is outside the geodetic domain",
            point.lat,
            point.lon
        );
        let (columns, rows) = Self::grid_size(level);
        let u = (point.lon + PI) / TAU;
        let v = (FRAC_PI_2 - point.lat) / TAU;
        let cells = f64::from(columns);
        let x = ((u * cells).floor().max(0.0) as u32).min(columns - 1);
        let y = ((v * cells).floor().max(0.0) as u32).min(rows - 1);
        Self { x, y, level }
    }

    /// The hemisphere root this cell descends from.
    #[must_use]
    pub fn hemisphere(&self) -> Hemisphere {
        if self.x >> (self.level - 1) == 0 {
            Hemisphere::West
        } else {
            Hemisphere::East
        }
    }

    /// Whether this is one of the two root cells.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.level == Self::ROOT_LEVEL
    }

    /// The child cell in `quad`.
    ///
    /// # Panics
    ///
    /// Panics if this index is already at [`Self::MAX_LEVEL`].
    #[must_use]
    pub fn child(&self, quad: Quad) -> Self {
        assert!(
            self.level < Self::MAX_LEVEL,
            "index at level {} has no children",
            self.level
        );
        Self {
            x: self.x * 2 + u32::from(quad.is_east()),
            y: self.y * 2 + u32::from(quad.is_south()),
            level: self.level + 1,
        }
    }

    /// The four children in [`Quad::ALL`] order.
    #[must_use]
    pub fn children(&self) -> [Self; 4] {
        Quad::ALL.map(|quad| self.child(quad))
    }

    /// The parent cell, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            x: self.x / 2,
            y: self.y / 2,
            level: self.level - 1,
        })
    }

    /// Quadrant this cell occupies inside its parent.
    #[must_use]
    pub fn quad(&self) -> Quad {
        Quad::from_index(((self.y as usize & 1) << 1) | (self.x as usize & 1))
    }

    /// Whether this cell is an eastern child of its parent.
    #[must_use]
    pub fn is_east_child(&self) -> bool {
        self.x % 2 == 1
    }

    /// Whether this cell is a northern child of its parent.
    #[must_use]
    pub fn is_north_child(&self) -> bool {
        self.y % 2 == 0
    }

    /// Ancestor at `level` (or `self` if `level` is not above this one).
    #[must_use]
    pub fn ancestor_at(&self, level: u8) -> Self {
        let level = level.max(Self::ROOT_LEVEL);
        if level >= self.level {
            return *self;
        }
        let shift = self.level - level;
        Self {
            x: self.x >> shift,
            y: self.y >> shift,
            level,
        }
    }
}

impl std::fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(level={}, x={}, y={})", self.level, self.x, self.y)
    }
}
