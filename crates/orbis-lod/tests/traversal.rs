//! Whole-globe refinement scenarios.

use glam::{DVec3, Vec2};
use orbis_config::{LevelEvaluation, LodConfig};
use orbis_geodetic::{ChunkIndex, Ellipsoid, Geodetic2, GeodeticPatch, Hemisphere, Quad};
use orbis_lod::{
    Camera, ChunkRenderer, ChunkedLodGlobe, LayerTiles, NodeId, Perspective, RenderData,
    RenderedChunk,
};
use orbis_tiles::{MemoryTileProvider, TextureCategory, TextureHandle, Tile, TileProviderManager};

const RADIUS: f64 = 6_371_000.0;

#[derive(Default)]
struct Collect {
    chunks: Vec<RenderedChunk>,
}

impl ChunkRenderer for Collect {
    fn update(&mut self) {
        self.chunks.clear();
    }

    fn render_chunk(&mut self, chunk: &RenderedChunk, _data: &RenderData) {
        self.chunks.push(chunk.clone());
    }
}

fn globe() -> ChunkedLodGlobe<Collect> {
    ChunkedLodGlobe::new(
        Ellipsoid::sphere(RADIUS),
        TileProviderManager::new(),
        Collect::default(),
    )
}

fn perspective() -> Perspective {
    Perspective {
        fov_y: 60f64.to_radians(),
        aspect_ratio: 16.0 / 9.0,
        near: 1.0,
        far: 1e13,
    }
}

/// Camera `altitude` meters above `point`, looking straight down.
fn looking_down(point: Geodetic2, altitude: f64) -> RenderData {
    let ellipsoid = Ellipsoid::sphere(RADIUS);
    let surface = ellipsoid.cartesian_surface_position(point);
    let position = surface + ellipsoid.geodetic_surface_normal(point) * altitude;
    RenderData {
        camera: Camera::look_at(position, surface, DVec3::Z, perspective()),
        time: 0.0,
    }
}

fn leaves(globe: &ChunkedLodGlobe<Collect>, hemisphere: Hemisphere) -> Vec<NodeId> {
    let tree = globe.quadtree();
    tree.reverse_breadth_first(tree.root(hemisphere))
        .into_iter()
        .filter(|&id| tree.node(id).is_leaf())
        .collect()
}

fn leaf_indices(globe: &ChunkedLodGlobe<Collect>, hemisphere: Hemisphere) -> Vec<ChunkIndex> {
    leaves(globe, hemisphere)
        .into_iter()
        .map(|id| globe.quadtree().node(id).chunk().index())
        .collect()
}

fn bounded_config() -> LodConfig {
    LodConfig {
        max_split_depth: 12,
        ..LodConfig::default()
    }
}

#[test]
fn test_far_camera_keeps_minimum_depth() {
    let mut globe = globe();
    let data = RenderData {
        camera: Camera::look_at(DVec3::new(1e12, 0.0, 0.0), DVec3::ZERO, DVec3::Z, perspective()),
        time: 0.0,
    };
    for evaluation in [LevelEvaluation::ProjectedArea, LevelEvaluation::Distance] {
        let config = LodConfig {
            evaluation,
            ..LodConfig::default()
        };
        let _ = globe.render(&data, &config);
        for hemisphere in Hemisphere::ALL {
            let mut indices = leaf_indices(&globe, hemisphere);
            indices.sort();
            let mut expected = hemisphere.root_index().children().to_vec();
            expected.sort();
            assert_eq!(indices, expected, "{evaluation:?} {hemisphere:?}");
        }
    }
}

#[test]
fn test_grazing_camera_refines_only_below() {
    let mut globe = globe();
    let below = Geodetic2::from_degrees(0.0, 90.0);
    let stats = globe.render(&looking_down(below, 100_000.0), &bounded_config());
    assert!(stats.splits > 2);

    // The west hemisphere is entirely behind the horizon.
    assert!(leaf_indices(&globe, Hemisphere::West).iter().all(|i| i.level == 2));

    let east = leaf_indices(&globe, Hemisphere::East);
    let deepest = east.iter().max_by_key(|i| i.level).unwrap();
    assert!(deepest.level > 6);
    let deepest_patch = GeodeticPatch::from(*deepest);
    let distance = (deepest_patch.center().lon - below.lon).abs() + deepest_patch.center().lat.abs();
    assert!(distance < 20f64.to_radians());

    // Chunks on the far side of the east hemisphere stay coarse.
    let far = globe.find_chunk(Geodetic2::from_degrees(0.0, 178.0));
    assert!(far.level() <= 3);
    assert!(!far.is_visible());
}

#[test]
fn test_second_identical_frame_has_no_churn() {
    let mut globe = globe();
    let data = looking_down(Geodetic2::from_degrees(37.0, -122.0), 30_000.0);
    let config = bounded_config();
    let first = globe.render(&data, &config);
    let second = globe.render(&data, &config);
    assert!(first.splits > 0);
    assert_eq!(second.splits, 0);
    assert_eq!(second.merges, 0);
    assert_eq!(first.chunk_nodes, second.chunk_nodes);
    assert_eq!(first.rendered, second.rendered);
}

#[test]
fn test_moving_away_merges_back() {
    let mut globe = globe();
    let config = bounded_config();
    let point = Geodetic2::from_degrees(-20.0, 30.0);
    let near = globe.render(&looking_down(point, 20_000.0), &config);
    let far = globe.render(&looking_down(point, 1e11), &config);
    assert!(near.leaves > 8);
    assert!(far.merges > 0);
    assert_eq!(far.leaves, 8);
    assert_eq!(far.chunk_nodes, 10);
}

#[test]
fn test_every_point_in_exactly_one_leaf() {
    let mut globe = globe();
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(10.0, -5.0), 50_000.0), &bounded_config());

    let patches: Vec<GeodeticPatch> = Hemisphere::ALL
        .iter()
        .flat_map(|&h| leaves(&globe, h))
        .map(|id| *globe.quadtree().node(id).chunk().surface_patch())
        .collect();

    // Offsets keep samples off cell boundaries.
    for i in 0..40 {
        for j in 0..40 {
            let lat = -89.0 + f64::from(i) * 4.4371;
            let lon = -179.0 + f64::from(j) * 8.9513;
            let point = Geodetic2::from_degrees(lat, lon);
            let containing = patches.iter().filter(|p| p.contains(point)).count();
            assert_eq!(containing, 1, "({lat}, {lon})");
        }
    }
    // Points close to the camera's refined area too.
    for k in 0..50 {
        let point = Geodetic2::from_degrees(10.0 + f64::from(k) * 0.0137, -5.0 + f64::from(k) * 0.0191);
        let containing = patches.iter().filter(|p| p.contains(point)).count();
        assert_eq!(containing, 1, "{k}");
    }
}

#[test]
fn test_leaf_levels_within_configured_range() {
    let views = [
        looking_down(Geodetic2::from_degrees(60.0, 10.0), 5_000.0),
        looking_down(Geodetic2::from_degrees(-85.0, 170.0), 200_000.0),
        looking_down(Geodetic2::from_degrees(0.0, 0.0), 1e10),
    ];
    for (min, max) in [(2, 8), (3, 5), (4, 4)] {
        let config = LodConfig {
            min_split_depth: min,
            max_split_depth: max,
            ..LodConfig::default()
        };
        let mut globe = globe();
        for view in &views {
            let _ = globe.render(view, &config);
            for hemisphere in Hemisphere::ALL {
                for index in leaf_indices(&globe, hemisphere) {
                    assert!((min..=max).contains(&index.level), "{index} not in [{min}, {max}]");
                }
            }
        }
    }
}

#[test]
fn test_children_tile_their_parent() {
    let mut globe = globe();
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(45.0, 45.0), 40_000.0), &bounded_config());
    let tree = globe.quadtree();
    for hemisphere in Hemisphere::ALL {
        for id in tree.reverse_breadth_first(tree.root(hemisphere)) {
            let node = tree.node(id);
            let Some(children) = node.children() else {
                continue;
            };
            let parent = node.chunk().surface_patch();
            for (quad, child) in Quad::ALL.into_iter().zip(children) {
                let patch = tree.node(child).chunk().surface_patch();
                let expected = parent.quadrant(quad);
                assert!((patch.center().lat - expected.center().lat).abs() < 1e-12);
                assert!((patch.center().lon - expected.center().lon).abs() < 1e-12);
                assert!((patch.half_size().lat * 2.0 - parent.half_size().lat).abs() < 1e-12);
                // The shared outer corner coincides with the parent's.
                let corner = patch.corner(quad);
                let parent_corner = parent.corner(quad);
                assert!((corner.lat - parent_corner.lat).abs() < 1e-12);
                assert!((corner.lon - parent_corner.lon).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn test_rendered_chunks_fall_back_to_coarse_tiles() {
    let mut globe = globe();
    let texture = TextureHandle {
        id: 1,
        width: 256,
        height: 256,
    };
    globe.tiles_mut().add_provider(
        TextureCategory::ColorTextures,
        "coarse",
        Box::new(MemoryTileProvider::new().with_coverage(3, Tile::ok(texture, None))),
    );
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(5.0, 5.0), 50_000.0), &bounded_config());

    let chunks = &globe.renderer().chunks;
    assert!(chunks.iter().any(|c| c.index.level > 3));
    for chunk in chunks {
        let layer = chunk.layers_of(TextureCategory::ColorTextures).next().unwrap();
        let LayerTiles::Single(resolved) = layer.tiles else {
            panic!("blending is off");
        };
        assert!(resolved.tile.is_ok());
        let levels_up = chunk.index.level.saturating_sub(3);
        let scale = 1.0 / (1u32 << levels_up) as f32;
        assert_eq!(resolved.uv_transform.scale, Vec2::splat(scale), "{}", chunk.index);
        let max = resolved.uv_transform.apply(Vec2::ONE);
        assert!(max.cmple(Vec2::ONE).all());
    }
}

#[test]
fn test_height_data_limits_depth() {
    let mut globe = globe();
    globe.tiles_mut().add_provider(
        TextureCategory::HeightMaps,
        "terrain",
        Box::new(MemoryTileProvider::new().with_coverage(
            5,
            Tile::ok(
                TextureHandle {
                    id: 2,
                    width: 64,
                    height: 64,
                },
                None,
            ),
        )),
    );
    let config = LodConfig {
        max_split_depth: 14,
        ..LodConfig::default()
    };
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(-33.9, 18.4), 1_000.0), &config);
    // Chunks with data may split once into children without data.
    for hemisphere in Hemisphere::ALL {
        assert!(leaf_indices(&globe, hemisphere).iter().all(|i| i.level <= 6));
    }

    let unlimited = LodConfig {
        limit_by_available_data: false,
        ..config
    };
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(-33.9, 18.4), 1_000.0), &unlimited);
    assert!(globe.find_chunk(Geodetic2::from_degrees(-33.9, 18.4)).level() > 6);
}

#[test]
fn test_culled_subtrees_expand_only_when_asked() {
    let mut globe = globe();
    let data = looking_down(Geodetic2::from_degrees(0.0, 90.0), 100_000.0);
    let expanding = LodConfig {
        evaluation: LevelEvaluation::Distance,
        expand_culled_subtrees: true,
        ..bounded_config()
    };
    let _ = globe.render(&data, &expanding);

    // Every west chunk is behind the horizon yet still refined by distance.
    let west = leaf_indices(&globe, Hemisphere::West);
    assert!(west.iter().all(|i| i.level > 2), "{west:?}");
    let tree = globe.quadtree();
    assert!(leaves(&globe, Hemisphere::West).iter().all(|&id| !tree.node(id).chunk().is_visible()));
    let visible = tree.visible_leaves();
    assert!(!visible.is_empty());
    assert!(visible.iter().all(|v| v.index.hemisphere() == Hemisphere::East));
    assert!(globe.renderer().chunks.iter().all(|c| c.index.hemisphere() == Hemisphere::East));

    let collapsing = LodConfig {
        expand_culled_subtrees: false,
        ..expanding
    };
    let stats = globe.render(&data, &collapsing);
    assert!(stats.merges > 0);
    assert!(leaf_indices(&globe, Hemisphere::West).iter().all(|i| i.level == 2));
}

#[test]
fn test_edge_points_have_one_owner() {
    let mut globe = globe();
    let _ = globe.render(&looking_down(Geodetic2::from_degrees(0.0, 0.0), 60_000.0), &bounded_config());

    let edges = [
        (0.0, 0.0),
        (10.0, 0.0),
        (0.0, -45.0),
        (45.0, 90.0),
        (-90.0, 0.0),
        (90.0, -180.0),
        (-90.0, 180.0),
    ];
    for (lat, lon) in edges {
        let point = Geodetic2::from_degrees(lat, lon);
        let chunk = globe.find_chunk(point);
        let index = chunk.index();
        assert_eq!(index.hemisphere(), Hemisphere::containing(point), "({lat}, {lon})");
        assert_eq!(index, ChunkIndex::from_geodetic(point, index.level), "({lat}, {lon})");
        assert!(chunk.surface_patch().contains(point));
    }
    // The meridian itself belongs to the east tree.
    assert_eq!(
        globe.find_chunk(Geodetic2::from_degrees(10.0, 0.0)).index().hemisphere(),
        Hemisphere::East
    );
}
