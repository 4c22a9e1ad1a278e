//! Per-frame camera and model state handed to the globe.

use glam::{DMat4, DQuat, DVec3};

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perspective {
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Width / height.
    pub aspect_ratio: f64,
    /// Near clip distance (positive).
    pub near: f64,
    /// Far clip distance (positive, > near).
    pub far: f64,
}

impl Perspective {
    /// Right-handed projection with depth in `[0, 1]`, near plane at 0.
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }
}

/// A viewer in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    position: DVec3,
    view: DMat4,
    projection: DMat4,
}

impl Camera {
    /// Create a camera from explicit matrices.
    #[must_use]
    pub fn new(position: DVec3, view: DMat4, projection: DMat4) -> Self {
        Self {
            position,
            view,
            projection,
        }
    }

    /// A camera at `position` looking at `target`.
    #[must_use]
    pub fn look_at(position: DVec3, target: DVec3, up: DVec3, perspective: Perspective) -> Self {
        Self::new(
            position,
            DMat4::look_at_rh(position, target, up),
            perspective.matrix(),
        )
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// World-to-view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> DMat4 {
        self.view
    }

    /// View-to-clip matrix.
    #[must_use]
    pub fn projection_matrix(&self) -> DMat4 {
        self.projection
    }

    /// World-to-clip matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> DMat4 {
        self.projection * self.view
    }

    /// Viewing direction in world space.
    #[must_use]
    pub fn forward(&self) -> DVec3 {
        // Third row of the view rotation is the camera's +Z axis in world space.
        -DVec3::new(self.view.x_axis.z, self.view.y_axis.z, self.view.z_axis.z).normalize_or_zero()
    }
}

/// Placement of the globe in world space: `T * R * S` with uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    /// World position of the globe center.
    pub translation: DVec3,
    /// Orientation of the globe.
    pub rotation: DQuat,
    /// Uniform scale.
    pub scale: f64,
}

impl ModelTransform {
    /// The globe at the origin, unrotated and unscaled.
    pub const IDENTITY: ModelTransform = ModelTransform {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: 1.0,
    };

    /// Model-to-world matrix.
    #[must_use]
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(
            DVec3::splat(self.scale),
            self.rotation,
            self.translation,
        )
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Input to [`ChunkedLodGlobe::update`](crate::ChunkedLodGlobe::update).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdateData {
    /// Where the globe is this frame.
    pub model_transform: ModelTransform,
    /// Simulation time in seconds.
    pub time: f64,
}

/// Input to [`ChunkedLodGlobe::render`](crate::ChunkedLodGlobe::render).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderData {
    /// The viewer.
    pub camera: Camera,
    /// Simulation time in seconds.
    pub time: f64,
}
