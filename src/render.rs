//! HTML map output
//!
//! Draws a [`RouteEnrichment`] as a self-contained Leaflet page: a marker for
//! each waypoint, a line for each leg's route, and an info marker for each
//! settlement found. The data is embedded in the page as a GeoJSON
//! `FeatureCollection`.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::pipeline::RouteEnrichment;
use crate::types::GeoPoint;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("encoding map data")]
    Json(#[from] serde_json::Error),
    #[error("no waypoints to center the map on")]
    Empty,
}

type Result<T> = std::result::Result<T, RenderError>;

const INITIAL_ZOOM: u8 = 5;
const ROUTE_COLOR: &str = "blue";
const ROUTE_WEIGHT: f64 = 2.5;

/// GeoJSON positions are longitude first.
fn position(point: &GeoPoint) -> Value {
    json!([point.lon().0, point.lat().0])
}

fn point_feature(point: &GeoPoint, kind: &str, label: &str) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": position(point) },
        "properties": { "kind": kind, "label": label },
    })
}

/// Build the GeoJSON `FeatureCollection` for an enrichment.
pub fn feature_collection(enrichment: &RouteEnrichment) -> Value {
    let mut features = Vec::new();
    for waypoint in &enrichment.waypoints {
        features.push(point_feature(&waypoint.point, "waypoint", waypoint.label()));
    }
    for leg in &enrichment.legs {
        features.push(json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": leg.polyline.iter().map(position).collect::<Vec<_>>(),
            },
            "properties": {
                "kind": "route",
                "from": enrichment.waypoints[leg.start].label(),
                "to": enrichment.waypoints[leg.end].label(),
            },
        }));
    }
    for settlement in enrichment.settlements() {
        features.push(point_feature(&settlement.point, "settlement", &settlement.name));
    }
    json!({ "type": "FeatureCollection", "features": features })
}

/// Write an HTML map of an enrichment
///
/// The map starts centered on the first waypoint. `generated_at` is recorded
/// in the page's metadata.
pub fn write_html_map<W: Write>(
    enrichment: &RouteEnrichment,
    generated_at: DateTime<Utc>,
    mut output: W,
) -> Result<()> {
    let center = enrichment
        .waypoints
        .first()
        .ok_or(RenderError::Empty)?
        .point;
    // Keep a "</script>" inside any place name from closing the script early.
    let data = serde_json::to_string(&feature_collection(enrichment))?.replace("</", "<\\/");

    write!(
        output,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="generator" content="{generator}">
<meta name="generated" content="{generated}">
<title>Route map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {data};
const map = L.map("map").setView([{lat}, {lon}], {zoom});
L.tileLayer("https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
const infoIcon = L.divIcon({{ className: "settlement", html: "&#8505;", iconSize: [16, 16] }});
L.geoJSON(data, {{
  style: () => ({{ color: "{color}", weight: {weight}, opacity: 1 }}),
  pointToLayer: (feature, latlng) =>
    feature.properties.kind === "settlement"
      ? L.marker(latlng, {{ icon: infoIcon }})
      : L.marker(latlng),
  onEachFeature: (feature, layer) => {{
    if (feature.properties.label) {{
      layer.bindPopup(document.createTextNode(feature.properties.label));
    }}
  }}
}}).addTo(map);
</script>
</body>
</html>
"#,
        generator = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
        generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        data = data,
        lat = center.lat().0,
        lon = center.lon().0,
        zoom = INITIAL_ZOOM,
        color = ROUTE_COLOR,
        weight = ROUTE_WEIGHT,
    )?;
    output.flush()?;
    debug!(
        "Wrote map with {} waypoints and {} legs",
        enrichment.waypoints.len(),
        enrichment.legs.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use dimensioned::si::M;
    use serde_json::json;

    use super::{RenderError, feature_collection, write_html_map};
    use crate::pipeline::{Leg, RouteEnrichment, SampleSearch, Waypoint};
    use crate::poi::SettlementRecord;
    use crate::{geo_point, geo_points};

    fn sample_enrichment() -> Result<RouteEnrichment> {
        Ok(RouteEnrichment {
            waypoints: vec![
                Waypoint {
                    place: "Calgary, Alberta, Canada".to_owned(),
                    point: geo_point!(51.05, -114.07),
                },
                Waypoint {
                    place: "Banff".to_owned(),
                    point: geo_point!(51.18, -115.57),
                },
            ],
            legs: vec![Leg {
                start: 0,
                end: 1,
                polyline: geo_points![(51.05, -114.07), (51.1, -115.0), (51.18, -115.57)],
                searches: vec![SampleSearch {
                    point: geo_point!(51.1, -115.0),
                    settlements: vec![SettlementRecord {
                        name: "Canmore</script>".to_owned(),
                        point: geo_point!(51.09, -115.35),
                        distance: 24_500.0 * M,
                    }],
                }],
            }],
            issues: vec![],
        })
    }

    #[test]
    fn test_feature_collection() -> Result<()> {
        let collection = feature_collection(&sample_enrichment()?);
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 4);

        assert_eq!(features[0]["properties"]["label"], "Calgary");
        assert_eq!(features[0]["geometry"]["coordinates"], json!([-114.07, 51.05]));
        assert_eq!(features[2]["geometry"]["type"], "LineString");
        assert_eq!(features[2]["properties"]["to"], "Banff");
        assert_eq!(
            features[2]["geometry"]["coordinates"][1],
            json!([-115.0, 51.1])
        );
        assert_eq!(features[3]["properties"]["kind"], "settlement");
        Ok(())
    }

    #[test]
    fn test_write_html_map() -> Result<()> {
        let mut out = Vec::new();
        let generated = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        write_html_map(&sample_enrichment()?, generated, &mut out)?;
        let html = String::from_utf8(out)?;

        assert!(html.contains(r#"<meta name="generated" content="2025-06-01T12:00:00Z">"#));
        assert!(html.contains(".setView([51.05, -114.07], 5)"));
        assert!(html.contains(r#""label":"Calgary""#));
        assert!(html.contains(r#"Canmore<\/script>"#));
        assert_eq!(html.matches("</script>").count(), 2);
        Ok(())
    }

    #[test]
    fn test_write_html_map_empty() {
        let result = write_html_map(&RouteEnrichment::default(), Utc::now(), Vec::new());
        assert!(matches!(result, Err(RenderError::Empty)));
    }
}
