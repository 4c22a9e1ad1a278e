//! Geodetic coordinates in radians and meters.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::ops::{Add, Sub};

/// A point on the reference surface given by latitude and longitude in radians.
///
/// Latitude is in \[-pi/2, pi/2\] and longitude in \[-pi, pi\] for valid points.
/// Differences between two points are also represented as `Geodetic2`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Geodetic2 {
    /// Latitude in radians, positive north.
    pub lat: f64,
    /// Longitude in radians, positive east.
    pub lon: f64,
}

impl Geodetic2 {
    /// Create a point from latitude and longitude in radians.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Create a point from latitude and longitude in degrees.
    #[must_use]
    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians())
    }

    /// `(lat, lon)` in degrees.
    #[must_use]
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lat.to_degrees(), self.lon.to_degrees())
    }

    /// Whether the point lies inside the valid geodetic domain.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= FRAC_PI_2 + 1e-12
            && self.lon.abs() <= PI + 1e-12
    }

    /// Component-wise scaling, used for half sizes.
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.lat * factor, self.lon * factor)
    }
}

impl Add for Geodetic2 {
    type Output = Geodetic2;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.lat + rhs.lat, self.lon + rhs.lon)
    }
}

impl Sub for Geodetic2 {
    type Output = Geodetic2;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.lat - rhs.lat, self.lon - rhs.lon)
    }
}

/// A geodetic point with a height above the reference surface in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Geodetic3 {
    /// Position on the reference surface.
    pub geodetic2: Geodetic2,
    /// Height above the surface along the geodetic normal, in meters.
    pub height: f64,
}

impl Geodetic3 {
    /// Create a point at `height` meters above `geodetic2`.
    #[must_use]
    pub const fn new(geodetic2: Geodetic2, height: f64) -> Self {
        Self { geodetic2, height }
    }
}

impl From<Geodetic2> for Geodetic3 {
    fn from(geodetic2: Geodetic2) -> Self {
        Self::new(geodetic2, 0.0)
    }
}

/// Normalize `angle` into the half-open interval `[center - pi, center + pi)`.
#[must_use]
pub fn normalize_around(angle: f64, center: f64) -> f64 {
    let start = center - PI;
    start + (angle - start).rem_euclid(TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrees_roundtrip() {
        let p = Geodetic2::from_degrees(58.5, -15.25);
        let (lat, lon) = p.to_degrees();
        assert!((lat - 58.5).abs() < 1e-12);
        assert!((lon + 15.25).abs() < 1e-12);
    }

    #[test]
    fn test_validity_bounds() {
        assert!(Geodetic2::from_degrees(90.0, 180.0).is_valid());
        assert!(Geodetic2::from_degrees(-90.0, -180.0).is_valid());
        assert!(!Geodetic2::from_degrees(91.0, 0.0).is_valid());
        assert!(!Geodetic2::from_degrees(0.0, 181.0).is_valid());
        assert!(!Geodetic2::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_arithmetic() {
        let a = Geodetic2::new(0.5, 1.0);
        let b = Geodetic2::new(0.25, -1.0);
        assert_eq!(a + b, Geodetic2::new(0.75, 0.0));
        assert_eq!(a - b, Geodetic2::new(0.25, 2.0));
        assert_eq!(a.scale(2.0), Geodetic2::new(1.0, 2.0));
    }

    #[test]
    fn test_normalize_around() {
        let wrapped = normalize_around(3.0 * PI / 2.0, 0.0);
        assert!((wrapped + PI / 2.0).abs() < 1e-12);
        let kept = normalize_around(0.3, 0.0);
        assert!((kept - 0.3).abs() < 1e-12);
        // Exactly pi maps to the lower end of the interval.
        assert!((normalize_around(PI, 0.0) + PI).abs() < 1e-12);
        let around_pi = normalize_around(-PI + 0.1, PI);
        assert!((around_pi - (PI + 0.1)).abs() < 1e-12);
    }
}
