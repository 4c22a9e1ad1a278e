//! Desired-level heuristics and their fusion into one target level.

use orbis_config::LevelEvaluation;
use orbis_geodetic::{ChunkIndex, Geodetic2, Geodetic3};
use orbis_tiles::{TextureCategory, TileStatus};

use crate::chunk::Chunk;
use crate::context::TraversalContext;

/// Output of a level evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DesiredLevel {
    /// The evaluator wants the chunk at this level. May lie outside the
    /// configured depth range; the caller clamps.
    Known(i32),
    /// The evaluator has no opinion.
    Unknown,
}

impl DesiredLevel {
    /// The known level, if any.
    #[must_use]
    pub fn known(self) -> Option<i32> {
        match self {
            DesiredLevel::Known(level) => Some(level),
            DesiredLevel::Unknown => None,
        }
    }
}

/// Strategies producing a desired level for a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodEvaluator {
    /// Level from the distance between the camera and the closest point of
    /// the chunk.
    Distance,
    /// Level from the solid angle a triangle spanning a quarter of the chunk
    /// covers, scaled to screen space.
    ProjectedArea,
    /// Depth limit imposed by the height data that exists for the chunk.
    AvailableTileData,
}

impl From<LevelEvaluation> for LodEvaluator {
    fn from(evaluation: LevelEvaluation) -> Self {
        match evaluation {
            LevelEvaluation::Distance => LodEvaluator::Distance,
            LevelEvaluation::ProjectedArea => LodEvaluator::ProjectedArea,
        }
    }
}

impl LodEvaluator {
    /// Desired level of `chunk` under this strategy.
    #[must_use]
    pub fn desired_level(&self, chunk: &Chunk, ctx: &TraversalContext<'_>) -> DesiredLevel {
        match self {
            LodEvaluator::Distance => distance_level(chunk, ctx),
            LodEvaluator::ProjectedArea => projected_area_level(chunk, ctx),
            LodEvaluator::AvailableTileData => available_data_level(chunk, ctx),
        }
    }
}

/// `f64` to `i32`, saturating at the range ends. NaN maps to 0.
fn saturate(level: f64) -> i32 {
    if level.is_nan() {
        return 0;
    }
    level.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

fn distance_level(chunk: &Chunk, ctx: &TraversalContext<'_>) -> DesiredLevel {
    let closest = chunk.surface_patch().closest_point(ctx.camera_geodetic);
    let height = chunk.bounding_heights().min;
    let position = ctx.ellipsoid.cartesian_position(Geodetic3::new(closest, height));
    let distance = (position - ctx.camera_position).length();
    let scaled = ctx.config.lod_scale_factor * ctx.ellipsoid.minimum_radius();
    DesiredLevel::Known(saturate((scaled / distance).log2().ceil()))
}

fn projected_area_level(chunk: &Chunk, ctx: &TraversalContext<'_>) -> DesiredLevel {
    let patch = chunk.surface_patch();
    let center = patch.center();
    let corner = patch.closest_corner(ctx.camera_geodetic);
    let height = chunk.bounding_heights().min;
    let at_height = |point: Geodetic2| ctx.ellipsoid.cartesian_position(Geodetic3::new(point, height));

    let camera = ctx.camera_position;
    let c = at_height(center);
    if (c - camera).length_squared() == 0.0 {
        return DesiredLevel::Known(i32::from(ChunkIndex::MAX_LEVEL));
    }
    let c1 = at_height(Geodetic2::new(center.lat, corner.lon));
    let c2 = at_height(Geodetic2::new(corner.lat, center.lon));

    // Triangle on the unit sphere around the camera.
    let a = (c - camera).normalize_or_zero();
    let b = (c1 - camera).normalize_or_zero();
    let cc = (c2 - camera).normalize_or_zero();
    let area = 0.5 * (cc - a).cross(b - a).length();

    let zoom = ctx.camera.projection_matrix().y_axis.y;
    let scaled_area = ctx.config.lod_scale_factor * 8.0 * area * zoom * zoom;
    DesiredLevel::Known(i32::from(chunk.level()) + saturate((scaled_area - 1.0).round()))
}

fn available_data_level(chunk: &Chunk, ctx: &TraversalContext<'_>) -> DesiredLevel {
    let level = i32::from(chunk.level());
    let mut limit: Option<i32> = None;
    for provider in ctx.tiles.group(TextureCategory::HeightMaps).active_providers() {
        let provider_limit = match provider.tile_status(chunk.index()) {
            // Data at this level lifts the limit entirely.
            TileStatus::Ok => return DesiredLevel::Unknown,
            TileStatus::Loading => level,
            TileStatus::Unavailable => level - 1,
        };
        limit = Some(limit.map_or(provider_limit, |l| l.max(provider_limit)));
    }
    limit.map_or(DesiredLevel::Unknown, DesiredLevel::Known)
}

/// Target level of `chunk`: the configured primary evaluator, capped by the
/// available height data when enabled, clamped to the configured range.
///
/// An unknown primary result keeps the chunk at its own level.
#[must_use]
pub fn fused_desired_level(chunk: &Chunk, ctx: &TraversalContext<'_>) -> u8 {
    let primary = LodEvaluator::from(ctx.config.evaluation)
        .desired_level(chunk, ctx)
        .known()
        .unwrap_or(i32::from(chunk.level()));
    let mut desired = primary;
    if ctx.config.limit_by_available_data
        && let DesiredLevel::Known(limit) = LodEvaluator::AvailableTileData.desired_level(chunk, ctx)
    {
        desired = desired.min(limit);
    }
    let clamped = desired.clamp(
        i32::from(ctx.config.min_split_depth),
        i32::from(ctx.config.max_split_depth),
    );
    // The clamp bounds are u8 levels.
    clamped as u8
}

#[cfg(test)]
mod tests {
    use glam::{DMat4, DVec3};
    use orbis_config::LodConfig;
    use orbis_geodetic::Ellipsoid;
    use orbis_tiles::{MemoryTileProvider, TextureHandle, Tile, TileProviderManager};

    use super::*;
    use crate::camera::{Camera, Perspective};
    use crate::culling::ChunkCuller;

    const RADIUS: f64 = 6_000_000.0;

    fn camera_above(ellipsoid: &Ellipsoid, point: Geodetic2, altitude: f64) -> DVec3 {
        ellipsoid.cartesian_position(Geodetic3::new(point, altitude))
    }

    fn camera_at(position: DVec3) -> Camera {
        let perspective = Perspective {
            fov_y: 60f64.to_radians(),
            aspect_ratio: 1.0,
            near: 1.0,
            far: 1e9,
        };
        let up = if position.normalize().z.abs() > 0.99 { DVec3::X } else { DVec3::Z };
        Camera::look_at(position, DVec3::ZERO, up, perspective)
    }

    fn evaluate(
        evaluator: LodEvaluator,
        index: ChunkIndex,
        camera: &Camera,
        tiles: &TileProviderManager,
        config: &LodConfig,
    ) -> DesiredLevel {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let cullers: [ChunkCuller; 0] = [];
        let ctx = TraversalContext::new(
            &ellipsoid,
            tiles,
            config,
            camera,
            &cullers,
            DMat4::IDENTITY,
            DMat4::IDENTITY,
        );
        evaluator.desired_level(&Chunk::new(index, &ellipsoid), &ctx)
    }

    fn handle() -> TextureHandle {
        TextureHandle {
            id: 1,
            width: 8,
            height: 8,
        }
    }

    #[test]
    fn test_distance_level_grows_as_camera_approaches() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let point = Geodetic2::from_degrees(10.0, 20.0);
        let index = ChunkIndex::from_geodetic(point, 6);
        let tiles = TileProviderManager::new();
        let config = LodConfig::default();

        let mut previous = i32::MIN;
        for altitude in [1e7, 1e6, 1e5, 1e4] {
            let camera = camera_at(camera_above(&ellipsoid, point, altitude));
            let level = evaluate(LodEvaluator::Distance, index, &camera, &tiles, &config)
                .known()
                .unwrap();
            assert!(level > previous, "{altitude}: {level} <= {previous}");
            previous = level;
        }
    }

    #[test]
    fn test_distance_level_formula() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let point = Geodetic2::from_degrees(0.5, 0.5);
        let index = ChunkIndex::from_geodetic(point, 8);
        let tiles = TileProviderManager::new();
        let config = LodConfig::default();
        // Camera straight above a point inside the patch: distance = altitude.
        let camera = camera_at(camera_above(&ellipsoid, point, 60_000.0));
        let level = evaluate(LodEvaluator::Distance, index, &camera, &tiles, &config);
        let expected = (config.lod_scale_factor * RADIUS / 60_000.0).log2().ceil() as i32;
        assert_eq!(level, DesiredLevel::Known(expected));
    }

    #[test]
    fn test_distance_on_surface_exceeds_max_level() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let point = Geodetic2::from_degrees(0.5, 0.5);
        let index = ChunkIndex::from_geodetic(point, 8);
        let tiles = TileProviderManager::new();
        let config = LodConfig::default();
        let camera = Camera::new(
            ellipsoid.cartesian_surface_position(point),
            DMat4::IDENTITY,
            DMat4::IDENTITY,
        );
        let level = evaluate(LodEvaluator::Distance, index, &camera, &tiles, &config);
        assert!(level.known().unwrap() > i32::from(ChunkIndex::MAX_LEVEL));
    }

    #[test]
    fn test_projected_area_prefers_near_chunks() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let point = Geodetic2::from_degrees(20.0, 30.0);
        let camera = camera_at(camera_above(&ellipsoid, point, 100_000.0));
        let tiles = TileProviderManager::new();
        let config = LodConfig::default();

        let near = ChunkIndex::from_geodetic(point, 6);
        let far = ChunkIndex::from_geodetic(Geodetic2::from_degrees(20.0, 70.0), 6);
        let near_level = evaluate(LodEvaluator::ProjectedArea, near, &camera, &tiles, &config);
        let far_level = evaluate(LodEvaluator::ProjectedArea, far, &camera, &tiles, &config);
        assert!(near_level.known().unwrap() > far_level.known().unwrap());
        assert!(near_level.known().unwrap() > 6);
    }

    #[test]
    fn test_projected_area_camera_at_center() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let index = ChunkIndex::new(5, 2, 3);
        let center = orbis_geodetic::GeodeticPatch::from(index).center();
        let camera = Camera::new(
            ellipsoid.cartesian_surface_position(center),
            DMat4::IDENTITY,
            DMat4::IDENTITY,
        );
        let tiles = TileProviderManager::new();
        let level = evaluate(
            LodEvaluator::ProjectedArea,
            index,
            &camera,
            &tiles,
            &LodConfig::default(),
        );
        assert_eq!(level, DesiredLevel::Known(i32::from(ChunkIndex::MAX_LEVEL)));
    }

    #[test]
    fn test_available_data_without_providers_is_unknown() {
        let tiles = TileProviderManager::new();
        let camera = camera_at(DVec3::new(2.0 * RADIUS, 0.0, 0.0));
        let level = evaluate(
            LodEvaluator::AvailableTileData,
            ChunkIndex::new(3, 1, 3),
            &camera,
            &tiles,
            &LodConfig::default(),
        );
        assert_eq!(level, DesiredLevel::Unknown);
    }

    #[test]
    fn test_available_data_levels() {
        let index = ChunkIndex::new(3, 1, 3);
        let camera = camera_at(DVec3::new(2.0 * RADIUS, 0.0, 0.0));
        let config = LodConfig::default();

        let mut tiles = TileProviderManager::new();
        tiles.add_provider(TextureCategory::HeightMaps, "empty", Box::new(MemoryTileProvider::new()));
        let level = evaluate(LodEvaluator::AvailableTileData, index, &camera, &tiles, &config);
        assert_eq!(level, DesiredLevel::Known(2));

        tiles.add_provider(
            TextureCategory::HeightMaps,
            "loading",
            Box::new(MemoryTileProvider::new().with_tile(index, Tile::LOADING)),
        );
        let level = evaluate(LodEvaluator::AvailableTileData, index, &camera, &tiles, &config);
        assert_eq!(level, DesiredLevel::Known(3));

        tiles.add_provider(
            TextureCategory::HeightMaps,
            "ready",
            Box::new(MemoryTileProvider::new().with_tile(index, Tile::ok(handle(), None))),
        );
        let level = evaluate(LodEvaluator::AvailableTileData, index, &camera, &tiles, &config);
        assert_eq!(level, DesiredLevel::Unknown);
    }

    #[test]
    fn test_fusion_clamps_and_limits() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let point = Geodetic2::from_degrees(0.5, 0.5);
        let index = ChunkIndex::from_geodetic(point, 4);
        let camera = camera_at(camera_above(&ellipsoid, point, 10.0));
        let mut config = LodConfig {
            evaluation: LevelEvaluation::Distance,
            min_split_depth: 2,
            max_split_depth: 12,
            ..LodConfig::default()
        };
        let mut tiles = TileProviderManager::new();
        let cullers: [ChunkCuller; 0] = [];
        let chunk = Chunk::new(index, &ellipsoid);

        let fused = |tiles: &TileProviderManager, config: &LodConfig| {
            let ctx = TraversalContext::new(
                &ellipsoid,
                tiles,
                config,
                &camera,
                &cullers,
                DMat4::IDENTITY,
                DMat4::IDENTITY,
            );
            fused_desired_level(&chunk, &ctx)
        };

        assert_eq!(fused(&tiles, &config), 12);

        // No height data below level 4's parent: capped at level 3.
        tiles.add_provider(TextureCategory::HeightMaps, "empty", Box::new(MemoryTileProvider::new()));
        assert_eq!(fused(&tiles, &config), 3);

        config.limit_by_available_data = false;
        assert_eq!(fused(&tiles, &config), 12);
    }

    #[test]
    fn test_fusion_respects_min_depth() {
        let ellipsoid = Ellipsoid::sphere(RADIUS);
        let index = ChunkIndex::new(0, 0, 2);
        let camera = camera_at(DVec3::new(1e12, 0.0, 0.0));
        let config = LodConfig {
            evaluation: LevelEvaluation::Distance,
            min_split_depth: 3,
            ..LodConfig::default()
        };
        let tiles = TileProviderManager::new();
        let cullers: [ChunkCuller; 0] = [];
        let ctx = TraversalContext::new(
            &ellipsoid,
            &tiles,
            &config,
            &camera,
            &cullers,
            DMat4::IDENTITY,
            DMat4::IDENTITY,
        );
        assert_eq!(fused_desired_level(&Chunk::new(index, &ellipsoid), &ctx), 3);
    }
}
