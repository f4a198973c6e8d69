//! Geographic coordinates.
//!
//! [`Coordinate`] is a plain latitude/longitude pair in degrees. Positions
//! between stops are computed by straight-line interpolation in degree space,
//! which is accurate enough over the few hundred metres separating two
//! shuttle stops.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl Coordinate {
    /// Create a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite and within the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Linearly interpolate towards `other`.
    ///
    /// `t = 0.0` returns `self` exactly; `t = 1.0` returns `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let p = DVec2::from(self).lerp(DVec2::from(other), t);
        Self::from(p)
    }
}

impl From<Coordinate> for DVec2 {
    fn from(c: Coordinate) -> Self {
        DVec2::new(c.lat, c.lng)
    }
}

impl From<DVec2> for Coordinate {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Coordinate = Coordinate::new(13.3339, 74.7423);
    const B: Coordinate = Coordinate::new(13.3355, 74.7445);

    #[test]
    fn test_lerp_at_zero_is_exact() {
        assert_eq!(A.lerp(B, 0.0), A);
    }

    #[test]
    fn test_lerp_at_one_reaches_target() {
        let p = A.lerp(B, 1.0);
        assert!((p.lat - B.lat).abs() < 1e-12);
        assert!((p.lng - B.lng).abs() < 1e-12);
    }

    #[test]
    fn test_lerp_below_one_approaches_target() {
        let p = A.lerp(B, 0.8);
        assert_ne!(p, B);
        assert!((p.lat - B.lat).abs() < (A.lat - B.lat).abs());
        assert!((p.lng - B.lng).abs() < (A.lng - B.lng).abs());
    }

    #[test]
    fn test_lerp_midpoint() {
        let p = Coordinate::new(0.0, 10.0).lerp(Coordinate::new(2.0, 20.0), 0.5);
        assert_eq!(p, Coordinate::new(1.0, 15.0));
    }

    #[test]
    fn test_validity() {
        assert!(A.is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn test_serializes_as_lat_lng() {
        let json = serde_json::to_value(A).unwrap();
        assert_eq!(json["lat"], 13.3339);
        assert_eq!(json["lng"], 74.7423);
    }
}
