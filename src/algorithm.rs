//! Algorithms for sampling routes and bounding searches
//!
//! To find settlements along a route, we first thin the route's geometry down
//! to a handful of sample points spaced roughly evenly by distance traveled,
//! and then search a box around each sample point. This module implements
//! both of those steps.

use dimensioned::si::{M, Meter};
use tracing::{debug, instrument};

use crate::geographic::geodesic_distance;
use crate::measure::DEG;
use crate::types::{BoundingBox, GeoPoint};

/// Approximate length of one degree of latitude, in kilometers.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Compute a square bounding box around a center point
///
/// The half-width of the box, in degrees, is `diameter / 2` divided by a fixed
/// [`KM_PER_DEGREE`]. That's a fair approximation for latitude, but the same
/// offset is applied to longitude, where a degree only covers about
/// `KM_PER_DEGREE * cos(latitude)` kilometers. So the box isn't square on the
/// ground: at 60°N it only extends about half as far east and west as it does
/// north and south, and settlements due east or west of the center near the
/// edge of the search radius fall outside the box.
///
/// The box is only meant as a coarse pre-filter. Anything found inside it
/// still needs to be checked against the true geodesic radius, since the
/// corners reach beyond the circle of the given diameter.
pub fn bounding_box(center: &GeoPoint, diameter: Meter<f64>) -> BoundingBox {
    let diameter_km = diameter.value_unsafe / 1000.0;
    let offset = (diameter_km / 2.0 / KM_PER_DEGREE) * DEG;
    BoundingBox {
        south: center.lat() - offset,
        west: center.lon() - offset,
        north: center.lat() + offset,
        east: center.lon() + offset,
    }
}

/// Sample points along a route at a fixed traversal interval
///
/// Walks the route's segments in order, accumulating their geodesic lengths.
/// Each time the accumulated distance reaches `interval`, the far endpoint of
/// the segment that crossed the threshold is emitted and the accumulator is
/// reset to zero.
///
/// Points are only ever taken from the route itself, so for routes with long
/// segments the spacing between samples can exceed `interval`. The route's
/// first point is never emitted, and any tail shorter than `interval` after
/// the last sample is dropped: a route shorter than `interval` yields no
/// samples at all.
///
/// # Example
///
/// ```
/// use dimensioned::f64prefixes::KILO;
/// use dimensioned::si::M;
/// use roadside::algorithm::sample_route;
/// use roadside::{DEG, GeoPoint};
///
/// // About 11 km along the equator.
/// let route = vec![
///     GeoPoint::new(0.0 * DEG, 0.0 * DEG)?,
///     GeoPoint::new(0.0 * DEG, 0.1 * DEG)?,
/// ];
/// assert!(sample_route(&route, 100.0 * KILO * M).is_empty());
/// assert_eq!(sample_route(&route, 10.0 * KILO * M), vec![route[1]]);
/// # Ok::<(), roadside::TypeError>(())
/// ```
#[instrument(level = "trace", skip_all)]
pub fn sample_route(route: &[GeoPoint], interval: Meter<f64>) -> Vec<GeoPoint> {
    let mut samples = Vec::new();
    let mut accumulated = 0.0 * M;
    for segment in route.windows(2) {
        accumulated += geodesic_distance(&segment[0], &segment[1]);
        if accumulated >= interval {
            samples.push(segment[1]);
            accumulated = 0.0 * M;
        }
    }
    debug!(
        "Sampled {} points from a route of {} points",
        samples.len(),
        route.len()
    );
    samples
}
