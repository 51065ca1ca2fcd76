//! Settlement search around a point
//!
//! Provides [`find_nearby`], which asks a [`PoiQuery`] for the towns and cities
//! inside a bounding box and keeps only those within a true geodesic radius of
//! the search center.

use dimensioned::si::Meter;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::algorithm::bounding_box;
use crate::geographic::geodesic_distance;
use crate::measure::DEG;
use crate::service::{PoiQuery, ServiceError};
use crate::types::{GeoPoint, TypeError};

/// Name given to settlements whose POI data carries no `name` tag.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Error, Debug)]
pub enum PoiError {
    #[error("settlement query failed")]
    Query(#[from] ServiceError),
    #[error("settlement coordinates out of range")]
    Type(#[from] TypeError),
}

type Result<T> = std::result::Result<T, PoiError>;

/// A town or city found near a search center.
#[derive(Clone, PartialEq, Debug)]
pub struct SettlementRecord {
    /// The settlement's name, or [`UNKNOWN_NAME`].
    pub name: String,

    /// Position of the settlement.
    pub point: GeoPoint,

    /// Geodesic distance from the search center.
    pub distance: Meter<f64>,
}

/// Find the towns and cities within a circle
///
/// Queries `poi_query` for settlements inside the [`bounding_box`] of the
/// circle of the given `diameter` around `center`, then discards any result
/// whose geodesic distance from `center` exceeds half the diameter. Results
/// keep the order in which the query returned them.
///
/// A failed query fails the whole search; there are no partial results. So an
/// empty `Ok` always means the query succeeded and nothing was in range.
#[instrument(level = "trace", skip(poi_query))]
pub fn find_nearby<Q>(
    center: &GeoPoint,
    diameter: Meter<f64>,
    poi_query: &Q,
) -> Result<Vec<SettlementRecord>>
where
    Q: PoiQuery + ?Sized,
{
    let bbox = bounding_box(center, diameter);
    let radius = diameter / 2.0;
    let elements = poi_query.query(&bbox)?;
    let num_elements = elements.len();

    let mut settlements = Vec::new();
    for element in elements {
        let point = GeoPoint::new(element.lat * DEG, element.lon * DEG)?;
        let distance = geodesic_distance(center, &point);
        if distance > radius {
            trace!("Discarding {:?} at {}: out of range", element.name(), point);
            continue;
        }
        settlements.push(SettlementRecord {
            name: element.name().unwrap_or(UNKNOWN_NAME).to_owned(),
            point,
            distance,
        });
    }

    debug!(
        "Kept {} of {} settlements within range of {}",
        settlements.len(),
        num_elements,
        center
    );
    Ok(settlements)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::Result;
    use approx::assert_relative_eq;
    use dimensioned::f64prefixes::KILO;
    use dimensioned::si::M;

    use super::{PoiError, UNKNOWN_NAME, find_nearby};
    use crate::algorithm::bounding_box;
    use crate::geographic::geodesic_distance;
    use crate::geo_point;
    use crate::service::{RawElement, ServiceError};
    use crate::types::BoundingBox;

    #[test]
    fn test_filters_by_geodesic_radius() -> Result<()> {
        let center = geo_point!(50.0, -120.0);
        let diameter = 125.0 * KILO * M;
        let bbox = bounding_box(&center, diameter);

        let near = RawElement::new(50.4, -120.4).with_tag("name", "Near");
        // Inside the box, but its corner is beyond the 62.5 km radius.
        let corner = RawElement::new(50.55, -120.55).with_tag("name", "Corner");
        // Nowhere near the radius, even if a query hands it back.
        let far = RawElement::new(50.0, -118.0).with_tag("name", "Far");
        assert!(bbox.contains(&geo_point!(corner.lat, corner.lon)));

        let elements = vec![far, corner, near];
        let query = |_: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            Ok(elements.clone())
        };
        let result = find_nearby(&center, diameter, &query)?;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Near");
        assert!(result[0].distance <= diameter / 2.0);
        assert_relative_eq!(
            result[0].distance,
            geodesic_distance(&center, &geo_point!(50.4, -120.4))
        );
        Ok(())
    }

    #[test]
    fn test_passes_bounding_box_to_query() -> Result<()> {
        let center = geo_point!(10.0, 20.0);
        let diameter = 222.0 * KILO * M;
        let seen = Cell::new(None);
        let query = |bbox: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            seen.set(Some(*bbox));
            Ok(vec![])
        };
        assert_eq!(find_nearby(&center, diameter, &query)?, vec![]);
        assert_eq!(seen.get(), Some(bounding_box(&center, diameter)));
        Ok(())
    }

    #[test]
    fn test_missing_name_is_unknown() -> Result<()> {
        let center = geo_point!(0.0, 0.0);
        let query = |_: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            Ok(vec![
                RawElement::new(0.1, 0.1).with_tag("place", "town"),
                RawElement::new(0.2, 0.0).with_tag("name", "Named"),
            ])
        };
        let result = find_nearby(&center, 100.0 * KILO * M, &query)?;
        let names = result.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![UNKNOWN_NAME, "Named"]);
        Ok(())
    }

    #[test]
    fn test_preserves_query_order() -> Result<()> {
        let center = geo_point!(0.0, 0.0);
        let query = |_: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            Ok(vec![
                RawElement::new(0.3, 0.0).with_tag("name", "Farther"),
                RawElement::new(0.1, 0.0).with_tag("name", "Closer"),
            ])
        };
        let result = find_nearby(&center, 100.0 * KILO * M, &query)?;
        let names = result.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Farther", "Closer"]);
        Ok(())
    }

    #[test]
    fn test_query_failure_is_an_error() -> Result<()> {
        let center = geo_point!(0.0, 0.0);
        let query = |_: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            Err(ServiceError::Parse("gateway timeout".to_owned()))
        };
        let result = find_nearby(&center, 100.0 * KILO * M, &query);
        assert!(matches!(result, Err(PoiError::Query(_))));
        Ok(())
    }

    #[test]
    fn test_invalid_element_coordinates() -> Result<()> {
        let center = geo_point!(0.0, 0.0);
        let query = |_: &BoundingBox| -> crate::service::Result<Vec<RawElement>> {
            Ok(vec![RawElement::new(95.0, 0.0)])
        };
        let result = find_nearby(&center, 100.0 * KILO * M, &query);
        assert!(matches!(result, Err(PoiError::Type(_))));
        Ok(())
    }
}
