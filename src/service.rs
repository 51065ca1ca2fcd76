//! Interfaces to external lookup services
//!
//! The enrichment pipeline depends on three collaborators: a geocoder that
//! turns place names into coordinates, a router that finds a driving path
//! between two coordinates, and a POI query that lists labeled places inside a
//! bounding box. Each is a trait here so that the pipeline can run against the
//! HTTP clients in [`crate::osm`] or against anything else.
//!
//! Plain closures with matching signatures implement these traits too.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{BoundingBox, GeoPoint, TypeError};

/// An error communicating with an external service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
    #[error("decoding JSON response")]
    Json(#[from] serde_json::Error),
    #[error("service returned {code}: {message}")]
    Api { code: String, message: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("coordinate out of range in response")]
    Type(#[from] TypeError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Resolves free-text place names to coordinates.
pub trait Geocoder {
    /// Look up the first match for `place`.
    ///
    /// Returns `Ok(None)` when the service has no match, as opposed to an
    /// error reaching the service at all.
    fn geocode(&self, place: &str) -> Result<Option<GeoPoint>>;
}

/// Finds driving routes between coordinates.
pub trait Router {
    /// Find a detailed driving path from `start` to `end`.
    ///
    /// The returned points are in order of travel. Returns `Ok(None)` when no
    /// route exists between the points.
    fn route(&self, start: &GeoPoint, end: &GeoPoint) -> Result<Option<Vec<GeoPoint>>>;
}

/// Lists towns and cities within a bounding box.
pub trait PoiQuery {
    fn query(&self, bbox: &BoundingBox) -> Result<Vec<RawElement>>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Result<Option<GeoPoint>>,
{
    fn geocode(&self, place: &str) -> Result<Option<GeoPoint>> {
        self(place)
    }
}

impl<F> Router for F
where
    F: Fn(&GeoPoint, &GeoPoint) -> Result<Option<Vec<GeoPoint>>>,
{
    fn route(&self, start: &GeoPoint, end: &GeoPoint) -> Result<Option<Vec<GeoPoint>>> {
        self(start, end)
    }
}

impl<F> PoiQuery for F
where
    F: Fn(&BoundingBox) -> Result<Vec<RawElement>>,
{
    fn query(&self, bbox: &BoundingBox) -> Result<Vec<RawElement>> {
        self(bbox)
    }
}

/// A labeled point feature as returned by a [`PoiQuery`].
///
/// Coordinates are left unvalidated until the element is turned into a
/// settlement.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct RawElement {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl RawElement {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }

    /// The element's `name` tag, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }
}
