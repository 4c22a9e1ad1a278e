//! Geodetic addressing for the globe quadtree: lat/lon points and patches,
//! quadtree cell indices split into two hemisphere roots, and the reference
//! ellipsoid used to move between geodetic and cartesian space.

mod chunk_index;
mod ellipsoid;
mod geodetic;
mod patch;

pub use chunk_index::{ChunkIndex, Hemisphere};
pub use ellipsoid::Ellipsoid;
pub use geodetic::{Geodetic2, Geodetic3, normalize_around};
pub use patch::{GeodeticPatch, Quad};
