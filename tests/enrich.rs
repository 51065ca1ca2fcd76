use std::cell::{Cell, RefCell};

use anyhow::Result;
use approx::assert_relative_eq;
use chrono::Utc;
use dimensioned::f64prefixes::KILO;
use dimensioned::si::M;
use roadside::service::{self, RawElement};
use roadside::{
    BoundingBox, DEG, EnrichmentOptions, GeoPoint, PipelineIssue, RoadsideError, UNKNOWN_NAME,
    enrich_route, map_route_with, polyline_length, write_html_map,
};

/// Resolves "City A" and "City B" about 250 km apart on the equator.
fn geocoder(place: &str) -> service::Result<Option<GeoPoint>> {
    Ok(match place {
        "City A" => Some(GeoPoint::new(0.0 * DEG, 10.0 * DEG)?),
        "City B" => Some(GeoPoint::new(0.0 * DEG, 12.25 * DEG)?),
        _ => None,
    })
}

/// A route with a point every 0.05° of longitude between the endpoints.
fn router(start: &GeoPoint, end: &GeoPoint) -> service::Result<Option<Vec<GeoPoint>>> {
    let steps = ((end.lon().0 - start.lon().0) / 0.05).round() as i64;
    let mut route = Vec::new();
    for i in 0..=steps {
        let lon = start.lon().0 + i as f64 * 0.05;
        route.push(GeoPoint::new(0.0 * DEG, lon * DEG)?);
    }
    Ok(Some(route))
}

#[test]
fn two_samples_on_a_250_km_leg() -> Result<()> {
    let options = EnrichmentOptions::default().with_waypoints(["City A", "City B"]);
    let queried = RefCell::new(Vec::new());
    let poi_query = |bbox: &BoundingBox| -> service::Result<Vec<RawElement>> {
        queried.borrow_mut().push(*bbox);
        let center_lon = (bbox.west.0 + bbox.east.0) / 2.0;
        Ok(vec![
            RawElement::new(0.2, center_lon)
                .with_tag("name", "Nearby")
                .with_tag("place", "town"),
            RawElement::new(-0.1, center_lon).with_tag("place", "city"),
            // In the corner of the box, about 87 km away.
            RawElement::new(0.55, center_lon + 0.55).with_tag("name", "Corner"),
        ])
    };

    let enrichment = enrich_route(&options, &geocoder, &router, &poi_query)?;

    assert!(enrichment.issues.is_empty());
    assert_eq!(enrichment.legs.len(), 1);
    let leg = &enrichment.legs[0];
    assert_relative_eq!(leg.distance(), 250.0 * KILO * M, max_relative = 0.01 * M);
    assert_eq!(leg.distance(), polyline_length(&leg.polyline));

    // Samples at roughly the 100 km and 200 km marks, and none near the end.
    assert_eq!(queried.borrow().len(), 2);
    assert_eq!(leg.searches.len(), 2);
    for (search, expected_km) in leg.searches.iter().zip([100.0, 200.0]) {
        let traveled = roadside::geodesic_distance(&leg.polyline[0], &search.point);
        assert_relative_eq!(traveled, expected_km * KILO * M, max_relative = 0.06 * M);
    }

    let names = enrichment
        .settlements()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Nearby", UNKNOWN_NAME, "Nearby", UNKNOWN_NAME]);
    for settlement in enrichment.settlements() {
        assert!(settlement.distance <= 62.5 * KILO * M);
    }

    let mut html = Vec::new();
    write_html_map(&enrichment, Utc::now(), &mut html)?;
    let html = String::from_utf8(html)?;
    assert!(html.contains(r#""label":"City A""#));
    assert!(html.contains(r#""label":"Nearby""#));
    assert!(!html.contains("Corner"));
    Ok(())
}

#[test]
fn unresolved_waypoint_is_reported() -> Result<()> {
    let options = EnrichmentOptions::default()
        .with_waypoints(["City A", "Lost City", "City B"])
        .with_sample_interval(50.0 * KILO * M)
        .with_search_diameter(20.0 * KILO * M);
    let no_settlements = |_: &BoundingBox| -> service::Result<Vec<RawElement>> { Ok(vec![]) };

    let enrichment = enrich_route(&options, &geocoder, &router, &no_settlements)?;

    assert_eq!(enrichment.waypoints.len(), 2);
    assert_eq!(enrichment.legs.len(), 1);
    // Nine 5.6 km segments per sample, so the end of the leg is sampled too.
    assert_eq!(enrichment.legs[0].searches.len(), 5);
    assert_eq!(enrichment.settlements().count(), 0);
    match &enrichment.issues[..] {
        [PipelineIssue::WaypointNotFound { place }] => assert_eq!(place, "Lost City"),
        other => panic!("unexpected issues: {other:?}"),
    }
    Ok(())
}

#[test]
fn map_written_once_enriched() -> Result<()> {
    let options = EnrichmentOptions::default().with_waypoints(["City A", "City B"]);
    let no_settlements = |_: &BoundingBox| -> service::Result<Vec<RawElement>> { Ok(vec![]) };
    let mut html = Vec::new();

    let enrichment = map_route_with(&options, &geocoder, &router, &no_settlements, || {
        Ok(&mut html)
    })?;

    assert_eq!(enrichment.legs.len(), 1);
    let html = String::from_utf8(html)?;
    assert!(html.contains(r#""label":"City B""#));
    Ok(())
}

#[test]
fn no_output_opened_when_nothing_resolves() -> Result<()> {
    let options = EnrichmentOptions::default().with_waypoints(["Lost City", "Atlantis"]);
    let no_settlements = |_: &BoundingBox| -> service::Result<Vec<RawElement>> { Ok(vec![]) };
    let opened = Cell::new(false);

    let result = map_route_with(&options, &geocoder, &router, &no_settlements, || {
        opened.set(true);
        Ok(Vec::new())
    });

    assert!(matches!(result, Err(RoadsideError::NoWaypointsResolved)));
    assert!(!opened.get());
    Ok(())
}
