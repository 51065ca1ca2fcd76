use std::fmt::{Display, Formatter};

use approx::{AbsDiffEq, RelativeEq, abs_diff_eq, relative_eq};
use thiserror::Error;

use crate::measure::{DEG, Degrees};

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("geographic point invariant: invalid value {1:?} for {0:?}")]
    GeoPointInvariant(GeoPointDimension, Degrees<f64>),
}

type Result<T> = std::result::Result<T, TypeError>;

/// A point on the surface of the WGS84 ellipsoid.
///
/// Enforces valid latitude and longitude values as type invariants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GeoPoint {
    lat: Degrees<f64>,
    lon: Degrees<f64>,
}

#[derive(Debug)]
pub enum GeoPointDimension {
    Latitude,
    Longitude,
}

impl GeoPoint {
    pub fn new(lat: Degrees<f64>, lon: Degrees<f64>) -> Result<GeoPoint> {
        // Written so that NaN fails both checks.
        if !(-90.0..=90.0).contains(&lat.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Latitude,
                lat,
            ));
        }
        if !(-180.0..=180.0).contains(&lon.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Longitude,
                lon,
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Get point latitude
    pub fn lat(&self) -> Degrees<f64> {
        self.lat
    }

    /// Get point longitude
    pub fn lon(&self) -> Degrees<f64> {
        self.lon
    }
}

impl Default for GeoPoint {
    fn default() -> GeoPoint {
        GeoPoint {
            lat: 0.0 * DEG,
            lon: 0.0 * DEG,
        }
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat.0, self.lon.0)
    }
}

impl AbsDiffEq for GeoPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        abs_diff_eq!(self.lat.0, other.lat.0, epsilon = epsilon)
            && abs_diff_eq!(self.lon.0, other.lon.0, epsilon = epsilon)
    }
}

impl RelativeEq for GeoPoint {
    fn default_max_relative() -> Self::Epsilon {
        0.000_000_000_000_001
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        relative_eq!(
            self.lat().0,
            other.lat().0,
            epsilon = epsilon,
            max_relative = max_relative
        ) && relative_eq!(
            self.lon().0,
            other.lon().0,
            epsilon = epsilon,
            max_relative = max_relative
        )
    }
}

/// An axis-aligned latitude/longitude rectangle.
///
/// Boxes don't wrap around the antimeridian or the poles, so the bounds are
/// plain degree values that may fall outside the valid coordinate ranges near
/// those edges.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    pub south: Degrees<f64>,
    pub west: Degrees<f64>,
    pub north: Degrees<f64>,
    pub east: Degrees<f64>,
}

impl BoundingBox {
    /// Checks whether a point lies within the box, edges included.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.south <= point.lat()
            && point.lat() <= self.north
            && self.west <= point.lon()
            && point.lon() <= self.east
    }
}

/// Formats as `south,west,north,east`, the order Overpass QL expects.
impl Display for BoundingBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.south.0, self.west.0, self.north.0, self.east.0
        )
    }
}

/// Instantiate a `GeoPoint` with a tuple-like syntax.
///
/// Must be used within a function returning a `Result` whose error type
/// converts from [`TypeError`].
#[macro_export]
macro_rules! geo_point {
    ( $lat:expr, $lon:expr ) => {
        $crate::types::GeoPoint::new($lat * $crate::measure::DEG, $lon * $crate::measure::DEG)?
    };
}

/// Instantiate a vec of `GeoPoint` with tuple-like syntax.
#[macro_export]
macro_rules! geo_points {
    ( $( ( $lat:expr, $lon:expr $(,)? ) ),* $(,)? ) => {
        vec![ $( $crate::geo_point!($lat, $lon) ),* ]
    };
}
