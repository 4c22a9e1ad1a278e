//! Frame-constant inputs shared by every chunk evaluation in a traversal.

use glam::{DMat4, DVec3};
use orbis_config::LodConfig;
use orbis_geodetic::{Ellipsoid, Geodetic2};
use orbis_tiles::TileProviderManager;

use crate::camera::Camera;
use crate::chunk::Chunk;
use crate::culling::ChunkCuller;

/// Everything a level evaluator or culler may read for one frame.
///
/// Derived values (camera in model space, its geodetic position, the
/// model-view-projection matrix) are computed once on construction.
pub struct TraversalContext<'a> {
    /// Reference surface of the globe.
    pub ellipsoid: &'a Ellipsoid,
    /// Tile sources.
    pub tiles: &'a TileProviderManager,
    /// Level and culling settings.
    pub config: &'a LodConfig,
    /// Camera driving level selection and culling.
    pub camera: &'a Camera,
    /// Culling strategies, each gated by its config flag.
    pub cullers: &'a [ChunkCuller],
    /// Model-to-world transform of the globe.
    pub model_transform: DMat4,
    /// Camera position in globe model space.
    pub camera_position: DVec3,
    /// Geodetic position of the point below the camera.
    pub camera_geodetic: Geodetic2,
    /// Model-to-clip transform.
    pub model_view_projection: DMat4,
}

impl<'a> TraversalContext<'a> {
    /// Build the context for one frame.
    pub fn new(
        ellipsoid: &'a Ellipsoid,
        tiles: &'a TileProviderManager,
        config: &'a LodConfig,
        camera: &'a Camera,
        cullers: &'a [ChunkCuller],
        model_transform: DMat4,
        inverse_model_transform: DMat4,
    ) -> Self {
        let camera_position = inverse_model_transform.transform_point3(camera.position());
        Self {
            ellipsoid,
            tiles,
            config,
            camera,
            cullers,
            model_transform,
            camera_position,
            camera_geodetic: ellipsoid.cartesian_to_geodetic2(camera_position),
            model_view_projection: camera.view_projection_matrix() * model_transform,
        }
    }

    /// Whether any enabled culler rejects `chunk`.
    #[must_use]
    pub fn is_cullable(&self, chunk: &Chunk) -> bool {
        self.cullers
            .iter()
            .any(|culler| culler.is_enabled(self.config) && culler.is_cullable(chunk, self))
    }
}
