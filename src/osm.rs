//! OpenStreetMap-backed service clients
//!
//! Blocking HTTP implementations of the [`crate::service`] traits:
//!
//! - [`NominatimGeocoder`] resolves place names with Nominatim's search API.
//! - [`OsrmRouter`] fetches driving routes from an OSRM server.
//! - [`OverpassPoiQuery`] lists towns and cities with the Overpass API.
//!
//! Each client decodes its service's response through a standalone function,
//! so the decoding can be exercised without network access.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::measure::DEG;
use crate::service::{Geocoder, PoiQuery, RawElement, Result, Router, ServiceError};
use crate::types::{BoundingBox, GeoPoint};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";
pub const DEFAULT_OVERPASS_URL: &str = "http://overpass-api.de/api/interpreter";

/// Options shared by the HTTP clients.
#[derive(Clone, Debug)]
pub struct HttpOptions {
    /// Applies to each request as a whole, from connecting to reading the
    /// response body.
    pub timeout: Duration,

    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,

    pub nominatim_url: String,
    pub osrm_url: String,
    pub overpass_url: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_owned(),
            osrm_url: DEFAULT_OSRM_URL.to_owned(),
            overpass_url: DEFAULT_OVERPASS_URL.to_owned(),
        }
    }
}

impl HttpOptions {
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_user_agent(self, user_agent: String) -> Self {
        Self { user_agent, ..self }
    }

    pub fn with_nominatim_url(self, nominatim_url: String) -> Self {
        Self {
            nominatim_url,
            ..self
        }
    }

    pub fn with_osrm_url(self, osrm_url: String) -> Self {
        Self { osrm_url, ..self }
    }

    pub fn with_overpass_url(self, overpass_url: String) -> Self {
        Self {
            overpass_url,
            ..self
        }
    }

    fn client(&self) -> Result<Client> {
        Ok(ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}

// Nominatim

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Decode a Nominatim `format=json` search response, keeping the first match.
pub fn decode_nominatim(body: &str) -> Result<Option<GeoPoint>> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    let Some(place) = places.first() else {
        return Ok(None);
    };
    let lat = place
        .lat
        .parse::<f64>()
        .map_err(|e| ServiceError::Parse(format!("latitude {:?}: {e}", place.lat)))?;
    let lon = place
        .lon
        .parse::<f64>()
        .map_err(|e| ServiceError::Parse(format!("longitude {:?}: {e}", place.lon)))?;
    Ok(Some(GeoPoint::new(lat * DEG, lon * DEG)?))
}

/// Geocoder backed by Nominatim's search API.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: options.client()?,
            base_url: trim_base(&options.nominatim_url),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(level = "trace", skip(self))]
    fn geocode(&self, place: &str) -> Result<Option<GeoPoint>> {
        let url = format!("{}/search", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()?
            .error_for_status()?
            .text()?;
        let point = decode_nominatim(&body)?;
        debug!("Geocoded {:?} to {:?}", place, point);
        Ok(point)
    }
}

// OSRM

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: longitude first.
    coordinates: Vec<[f64; 2]>,
}

/// OSRM response codes meaning there's simply no route between the points.
const OSRM_NO_ROUTE_CODES: [&str; 2] = ["NoRoute", "NoSegment"];

/// Decode an OSRM route response with `geometries=geojson`.
///
/// Returns the first route's geometry as latitude-first points.
pub fn decode_osrm(body: &str) -> Result<Option<Vec<GeoPoint>>> {
    let response: OsrmResponse = serde_json::from_str(body)?;
    if OSRM_NO_ROUTE_CODES.contains(&response.code.as_str()) {
        return Ok(None);
    }
    if response.code != "Ok" {
        return Err(ServiceError::Api {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    let Some(route) = response.routes.into_iter().next() else {
        return Ok(None);
    };
    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| GeoPoint::new(*lat * DEG, *lon * DEG))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some(points))
}

/// Router backed by an OSRM server's driving profile.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: options.client()?,
            base_url: trim_base(&options.osrm_url),
        })
    }

    fn route_url(&self, start: &GeoPoint, end: &GeoPoint) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url,
            start.lon().0,
            start.lat().0,
            end.lon().0,
            end.lat().0
        )
    }
}

impl Router for OsrmRouter {
    #[instrument(level = "trace", skip(self))]
    fn route(&self, start: &GeoPoint, end: &GeoPoint) -> Result<Option<Vec<GeoPoint>>> {
        // OSRM reports a missing route with a client error status and a JSON
        // body, so the body is decoded regardless of status.
        let response = self
            .client
            .get(self.route_url(start, end))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()?;
        let status = response.status();
        let body = response.text()?;
        match decode_osrm(&body) {
            Err(ServiceError::Json(e)) if !status.is_success() => Err(ServiceError::Api {
                code: status.to_string(),
                message: e.to_string(),
            }),
            result => {
                if let Ok(Some(points)) = &result {
                    debug!("Route from {} to {} has {} points", start, end, points.len());
                }
                result
            }
        }
    }
}

// Overpass

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<RawElement>,
    #[serde(default)]
    remark: Option<String>,
}

/// Build the Overpass QL query for town and city nodes inside a box.
pub fn overpass_query(bbox: &BoundingBox, timeout: Duration) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
(
  node["place"="town"]({bbox});
  node["place"="city"]({bbox});
);
out body;"#,
        timeout = timeout.as_secs().max(1),
        bbox = bbox,
    )
}

/// Decode an Overpass `out:json` response.
///
/// Overpass reports query failures such as timeouts with a successful HTTP
/// status and a `remark` beginning with "runtime error". Those are errors, not
/// empty results.
pub fn decode_overpass(body: &str) -> Result<Vec<RawElement>> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    match response.remark {
        Some(message) if message.trim_start().starts_with("runtime error") => {
            Err(ServiceError::Api {
                code: "remark".to_owned(),
                message,
            })
        }
        _ => Ok(response.elements),
    }
}

/// POI query backed by the Overpass API.
pub struct OverpassPoiQuery {
    client: Client,
    url: String,
    timeout: Duration,
}

impl OverpassPoiQuery {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        Ok(Self {
            client: options.client()?,
            url: options.overpass_url.clone(),
            timeout: options.timeout,
        })
    }
}

impl PoiQuery for OverpassPoiQuery {
    #[instrument(level = "trace", skip(self))]
    fn query(&self, bbox: &BoundingBox) -> Result<Vec<RawElement>> {
        let query = overpass_query(bbox, self.timeout);
        let body = self
            .client
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()?
            .error_for_status()?
            .text()?;
        let elements = decode_overpass(&body)?;
        debug!("Overpass returned {} elements for {}", elements.len(), bbox);
        Ok(elements)
    }
}
