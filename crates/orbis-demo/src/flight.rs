//! Scripted descent towards a target point.

use glam::DVec3;
use orbis_config::{FlightConfig, ViewConfig};
use orbis_geodetic::{Ellipsoid, Geodetic2};
use orbis_lod::{Camera, Perspective};

/// Camera path from high orbit down to a tilted low view.
///
/// Altitude falls geometrically between the start and end altitudes; the
/// view tilts from straight down towards the north horizon.
pub struct Flight {
    target: Geodetic2,
    start_altitude: f64,
    end_altitude: f64,
    end_tilt: f64,
    frames: u32,
    perspective: Perspective,
}

impl Flight {
    pub fn new(flight: &FlightConfig, view: &ViewConfig) -> Self {
        Self {
            target: Geodetic2::from_degrees(flight.latitude_deg, flight.longitude_deg),
            start_altitude: flight.start_altitude_m,
            end_altitude: flight.end_altitude_m,
            end_tilt: flight.end_tilt_deg.to_radians(),
            frames: flight.frames,
            perspective: Perspective {
                fov_y: view.fov_y_deg.to_radians(),
                aspect_ratio: f64::from(view.width) / f64::from(view.height.max(1)),
                near: view.near_m,
                far: view.far_m,
            },
        }
    }

    /// Number of frames in the flight.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Progress in `[0, 1]` at `frame`.
    fn progress(&self, frame: u32) -> f64 {
        if self.frames <= 1 {
            return 1.0;
        }
        f64::from(frame.min(self.frames - 1)) / f64::from(self.frames - 1)
    }

    /// Altitude above the target at `frame`.
    pub fn altitude(&self, frame: u32) -> f64 {
        let t = self.progress(frame);
        let start = self.start_altitude.max(1.0);
        let end = self.end_altitude.max(1.0);
        start * (end / start).powf(t)
    }

    /// Camera at `frame`.
    pub fn camera(&self, ellipsoid: &Ellipsoid, frame: u32) -> Camera {
        let t = self.progress(frame);
        let tilt = self.end_tilt * t * t;
        let normal = ellipsoid.geodetic_surface_normal(self.target);
        let (sin_lat, cos_lat) = self.target.lat.sin_cos();
        let (sin_lon, cos_lon) = self.target.lon.sin_cos();
        let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);

        let (sin_tilt, cos_tilt) = tilt.sin_cos();
        let forward = -normal * cos_tilt + north * sin_tilt;
        let up = normal * sin_tilt + north * cos_tilt;
        let position = ellipsoid.cartesian_surface_position(self.target) + normal * self.altitude(frame);
        Camera::look_at(position, position + forward, up, self.perspective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(frames: u32) -> Flight {
        let config = FlightConfig {
            frames,
            ..FlightConfig::default()
        };
        Flight::new(&config, &ViewConfig::default())
    }

    #[test]
    fn test_altitude_endpoints() {
        let flight = flight(10);
        assert!((flight.altitude(0) - 20_000_000.0).abs() < 1e-6);
        assert!((flight.altitude(9) - 1_000.0).abs() < 1e-6);
        assert!(flight.altitude(4) < flight.altitude(3));
        assert_eq!(flight.altitude(50), flight.altitude(9));
    }

    #[test]
    fn test_first_frame_looks_down() {
        let ellipsoid = Ellipsoid::wgs84();
        let flight = flight(10);
        let camera = flight.camera(&ellipsoid, 0);
        let normal = ellipsoid.geodetic_surface_normal(flight.target);
        assert!((camera.forward() + normal).length() < 1e-9);
    }

    #[test]
    fn test_last_frame_is_tilted() {
        let ellipsoid = Ellipsoid::wgs84();
        let flight = flight(10);
        let camera = flight.camera(&ellipsoid, 9);
        let normal = ellipsoid.geodetic_surface_normal(flight.target);
        let angle = (-camera.forward().dot(normal)).acos();
        assert!((angle - 70f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_single_frame_flight() {
        let flight = flight(1);
        assert!((flight.altitude(0) - 1_000.0).abs() < 1e-6);
    }
}
