//! Functions from GeographicLib
//!
//! Wraps the Rust port of GeographicLib in an interface expressed in terms of
//! this crate's [`GeoPoint`] and unit types. All distances in the crate come
//! from here, so that the route sampler and the settlement filter agree on
//! the same WGS84 ellipsoid.

use std::sync::LazyLock;

use dimensioned::si::{M, Meter};
use geographiclib_rs::{Geodesic, InverseGeodesic};

use crate::types::GeoPoint;

static WGS84: LazyLock<Geodesic> = LazyLock::new(Geodesic::wgs84);

/// Geodesic distance between two points on WGS84.
pub fn geodesic_distance(point1: &GeoPoint, point2: &GeoPoint) -> Meter<f64> {
    let geo_distance_m: f64 =
        WGS84.inverse(point1.lat().0, point1.lon().0, point2.lat().0, point2.lon().0);
    geo_distance_m * M
}

/// Total geodesic length of a polyline.
pub fn polyline_length(points: &[GeoPoint]) -> Meter<f64> {
    points
        .windows(2)
        .map(|w| geodesic_distance(&w[0], &w[1]))
        .fold(0.0 * M, |total, d| total + d)
}

/// Solutions to the full inverse and direct problems, for building and
/// checking test geometry.
#[cfg(test)]
pub(crate) mod testing {
    use dimensioned::si::{M, Meter};
    use geographiclib_rs::{DirectGeodesic, InverseGeodesic};

    use super::WGS84;
    use crate::measure::{DEG, Degrees};
    use crate::types::{GeoPoint, TypeError};

    /// A solution to the inverse problem in geodesy.
    #[derive(Clone, Copy, Debug)]
    pub struct InverseSolution {
        pub geo_distance: Meter<f64>,
        pub azimuth1: Degrees<f64>,
    }

    pub fn geodesic_inverse(point1: &GeoPoint, point2: &GeoPoint) -> InverseSolution {
        let (geo_distance_m, azimuth1_deg, _, _): (f64, f64, f64, f64) =
            WGS84.inverse(point1.lat().0, point1.lon().0, point2.lat().0, point2.lon().0);
        InverseSolution {
            geo_distance: geo_distance_m * M,
            azimuth1: azimuth1_deg * DEG,
        }
    }

    /// Find where we end up after traveling `distance` from `point1` along
    /// `azimuth`.
    pub fn geodesic_direct(
        point1: &GeoPoint,
        azimuth: Degrees<f64>,
        distance: Meter<f64>,
    ) -> Result<GeoPoint, TypeError> {
        let (lat2_deg, lon2_deg): (f64, f64) = WGS84.direct(
            point1.lat().0,
            point1.lon().0,
            azimuth.0,
            distance.value_unsafe,
        );
        GeoPoint::new(lat2_deg * DEG, lon2_deg * DEG)
    }
}
