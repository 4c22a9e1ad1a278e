//! Visibility tests that let the traversal skip chunks.
//!
//! Both tests work in globe model space and are pure functions of the chunk
//! and the frame context.

use glam::{DVec3, DVec4};
use orbis_config::LodConfig;

use crate::chunk::Chunk;
use crate::context::TraversalContext;

/// Axis-aligned box in three dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb3 {
    /// The normalized device volume of a `[0, 1]` depth projection, left open
    /// towards the far end so distant chunks are kept.
    pub const VIEW_VOLUME: Aabb3 = Aabb3 {
        min: DVec3::new(-1.0, -1.0, 0.0),
        max: DVec3::new(1.0, 1.0, 1e35),
    };

    /// A box that contains nothing; expanding it by a point yields that point.
    pub const EMPTY: Aabb3 = Aabb3 {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a box from its corners.
    #[must_use]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing `points`.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut aabb, p| {
            aabb.expand(p);
            aabb
        })
    }

    /// Grow the box to include `point`.
    pub fn expand(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Whether `point` is inside, boundaries included.
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Whether the two boxes overlap, touching included.
    #[must_use]
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// The eight corners, bit 0 selecting max x, bit 1 max y, bit 2 max z.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }
}

/// Horizon occlusion test on a sphere of the ellipsoid's minimum radius.
///
/// `object` is a surface point with a bounding sphere of `object_radius`.
/// The object is hidden when it lies farther from the camera than the
/// horizon distance plus its own distance to the horizon tangent point.
/// A camera inside the sphere never culls.
#[must_use]
pub fn is_below_horizon(
    camera: DVec3,
    globe_center: DVec3,
    object: DVec3,
    object_radius: f64,
    minimum_globe_radius: f64,
) -> bool {
    let camera_distance_sq = (camera - globe_center).length_squared();
    let radius_sq = minimum_globe_radius * minimum_globe_radius;
    if camera_distance_sq <= radius_sq {
        return false;
    }
    let distance_to_horizon = (camera_distance_sq - radius_sq).sqrt();
    let lowered = minimum_globe_radius - object_radius;
    let object_to_horizon = ((object - globe_center).length_squared() - lowered * lowered)
        .max(0.0)
        .sqrt();
    let min_occluded_distance_sq =
        (distance_to_horizon + object_to_horizon).powi(2) + object_radius * object_radius;
    (object - camera).length_squared() > min_occluded_distance_sq
}

/// A culling strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChunkCuller {
    /// Reject chunks hidden behind the globe's horizon.
    Horizon,
    /// Reject chunks whose projected bounds miss the view volume.
    Frustum {
        /// Normalized device volume to test against.
        view_volume: Aabb3,
    },
}

impl ChunkCuller {
    /// Frustum culler against [`Aabb3::VIEW_VOLUME`].
    #[must_use]
    pub fn frustum() -> Self {
        ChunkCuller::Frustum {
            view_volume: Aabb3::VIEW_VOLUME,
        }
    }

    /// The default set: horizon then frustum.
    #[must_use]
    pub fn defaults() -> Vec<ChunkCuller> {
        vec![ChunkCuller::Horizon, ChunkCuller::frustum()]
    }

    /// Whether the config enables this strategy.
    #[must_use]
    pub fn is_enabled(&self, config: &LodConfig) -> bool {
        match self {
            ChunkCuller::Horizon => config.horizon_culling,
            ChunkCuller::Frustum { .. } => config.frustum_culling,
        }
    }

    /// Whether `chunk` can be skipped this frame.
    #[must_use]
    pub fn is_cullable(&self, chunk: &Chunk, ctx: &TraversalContext<'_>) -> bool {
        match self {
            ChunkCuller::Horizon => {
                let closest = chunk.surface_patch().closest_point(ctx.camera_geodetic);
                let object = ctx.ellipsoid.cartesian_surface_position(closest);
                is_below_horizon(
                    ctx.camera_position,
                    DVec3::ZERO,
                    object,
                    chunk.bounding_heights().max.max(0.0),
                    ctx.ellipsoid.minimum_radius(),
                )
            }
            ChunkCuller::Frustum { view_volume } => {
                let bounds = Aabb3::from_points(
                    chunk
                        .bounding_corners()
                        .iter()
                        .map(|corner| ndc(ctx.model_view_projection * corner.extend(1.0))),
                );
                !view_volume.intersects(&bounds)
            }
        }
    }
}

/// Clip-space point divided by `|w|`, keeping points behind the viewer on
/// the negative depth side.
#[must_use]
pub fn ndc(clip: DVec4) -> DVec3 {
    clip.truncate() / clip.w.abs()
}
