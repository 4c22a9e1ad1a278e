//! Reference ellipsoid and cartesian/geodetic conversions.
//!
//! Cartesian coordinates are in the globe's model space: origin at the center,
//! +Z through the north pole, +X through (lat 0, lon 0).

use glam::DVec3;

use crate::geodetic::{Geodetic2, Geodetic3};

/// Convergence tolerance of the surface projection iteration.
const PROJECTION_TOLERANCE: f64 = 1e-12;
/// Upper bound on surface projection iterations.
const PROJECTION_MAX_ITERATIONS: usize = 64;

/// A triaxial ellipsoid centered at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
    radii_squared: DVec3,
    one_over_radii_squared: DVec3,
}

impl Ellipsoid {
    /// Create an ellipsoid from its three semi-axes in meters.
    ///
    /// # Panics
    ///
    /// Panics if any radius is not strictly positive.
    #[must_use]
    pub fn new(radii: DVec3) -> Self {
        assert!(
            radii.min_element() > 0.0,
            "ellipsoid radii must be positive, got {radii}"
        );
        let radii_squared = radii * radii;
        Self {
            radii,
            radii_squared,
            one_over_radii_squared: DVec3::ONE / radii_squared,
        }
    }

    /// A sphere of the given radius.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::new(DVec3::splat(radius))
    }

    /// The WGS84 ellipsoid.
    #[must_use]
    pub fn wgs84() -> Self {
        Self::new(DVec3::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179))
    }

    /// Semi-axes in meters.
    #[must_use]
    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    /// Smallest semi-axis.
    #[must_use]
    pub fn minimum_radius(&self) -> f64 {
        self.radii.min_element()
    }

    /// Largest semi-axis.
    #[must_use]
    pub fn maximum_radius(&self) -> f64 {
        self.radii.max_element()
    }

    /// Mean of the three semi-axes.
    #[must_use]
    pub fn average_radius(&self) -> f64 {
        (self.radii.x + self.radii.y + self.radii.z) / 3.0
    }

    /// Unit normal of the ellipsoid surface at a geodetic point.
    #[must_use]
    pub fn geodetic_surface_normal(&self, point: Geodetic2) -> DVec3 {
        let cos_lat = point.lat.cos();
        DVec3::new(
            cos_lat * point.lon.cos(),
            cos_lat * point.lon.sin(),
            point.lat.sin(),
        )
    }

    /// Unit normal of the ellipsoid surface at a cartesian surface point.
    #[must_use]
    pub fn geodetic_surface_normal_for_position(&self, position: DVec3) -> DVec3 {
        (position * self.one_over_radii_squared).normalize_or_zero()
    }

    /// Cartesian position of a point on the surface.
    #[must_use]
    pub fn cartesian_surface_position(&self, point: Geodetic2) -> DVec3 {
        let normal = self.geodetic_surface_normal(point);
        let k = self.radii_squared * normal;
        let gamma = normal.dot(k).sqrt();
        k / gamma
    }

    /// Cartesian position of a point at a height above the surface.
    #[must_use]
    pub fn cartesian_position(&self, point: Geodetic3) -> DVec3 {
        self.cartesian_surface_position(point.geodetic2)
            + self.geodetic_surface_normal(point.geodetic2) * point.height
    }

    /// Project `position` onto the surface along the geodetic normal.
    ///
    /// Solves for the scale `lambda` of the surface normal with Newton
    /// iteration, starting from the radial projection. The origin has no
    /// unique projection and maps to the north pole.
    #[must_use]
    pub fn geodetic_surface_projection(&self, position: DVec3) -> DVec3 {
        let scaled = position / self.radii;
        let squared = scaled * scaled;
        let squared_norm = squared.x + squared.y + squared.z;
        if squared_norm <= f64::EPSILON {
            return DVec3::new(0.0, 0.0, self.radii.z);
        }
        let ratio = (1.0 / squared_norm).sqrt();
        let radial = position * ratio;

        let gradient = radial * self.one_over_radii_squared * 2.0;
        let mut lambda = (1.0 - ratio) * position.length() / (0.5 * gradient.length());
        let mut multiplier = DVec3::ONE;

        for _ in 0..PROJECTION_MAX_ITERATIONS {
            multiplier = DVec3::ONE / (DVec3::ONE + self.one_over_radii_squared * lambda);
            let m2 = multiplier * multiplier;
            let m3 = m2 * multiplier;
            let func = squared.dot(m2) - 1.0;
            if func.abs() <= PROJECTION_TOLERANCE {
                break;
            }
            let denominator = squared.dot(m3 * self.one_over_radii_squared);
            let derivative = -2.0 * denominator;
            lambda -= func / derivative;
        }
        position * multiplier
    }

    /// Geodetic coordinates of the surface point below `position`.
    #[must_use]
    pub fn cartesian_to_geodetic2(&self, position: DVec3) -> Geodetic2 {
        let surface = self.geodetic_surface_projection(position);
        let normal = self.geodetic_surface_normal_for_position(surface);
        Geodetic2::new(normal.z.clamp(-1.0, 1.0).asin(), normal.y.atan2(normal.x))
    }

    /// Geodetic coordinates and signed height of `position`.
    #[must_use]
    pub fn cartesian_to_geodetic3(&self, position: DVec3) -> Geodetic3 {
        let surface = self.geodetic_surface_projection(position);
        let normal = self.geodetic_surface_normal_for_position(surface);
        let offset = position - surface;
        let height = offset.dot(normal).signum() * offset.length();
        Geodetic3::new(
            Geodetic2::new(normal.z.clamp(-1.0, 1.0).asin(), normal.y.atan2(normal.x)),
            height,
        )
    }
}
