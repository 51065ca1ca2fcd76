//! A CLI tool and library for finding the towns along a driving route.
//!
//! Given a list of place names, resolves each to a position, fetches a
//! driving route for each leg between consecutive places, and searches for
//! towns and cities near points sampled at regular intervals along the way.
//! The results can be drawn as an HTML map and summarized as a text report.
//!
//! Distances are computed on the WGS84 ellipsoid with
//! [GeographicLib](https://geographiclib.sourceforge.io/)'s geodesic
//! algorithms. Place names, routes and settlements come from OpenStreetMap
//! services through the clients in [`osm`], though any implementation of the
//! traits in [`service`] will do.
//!
//! See the [`map_route`] function, which is used by the CLI, for the main
//! entry point into the library, or [`enrich_route`] to work with the
//! results directly.
//!
//! # Feature flags
//!
//! - `cli` enables the additional dependencies needed by the CLI

pub mod algorithm;
pub mod geographic;
pub mod measure;
pub mod osm;
mod pipeline;
mod poi;
mod render;
mod report;
pub mod service;
pub mod types;

pub mod internal;

use std::io::Write;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

pub use crate::geographic::{geodesic_distance, polyline_length};
pub use crate::measure::{DEG, Degrees, Kilometers, Miles};
pub use crate::osm::HttpOptions;
pub use crate::pipeline::{
    EnrichmentOptions, Leg, PipelineIssue, RouteEnrichment, SampleSearch, Waypoint, enrich_route,
};
pub use crate::poi::{PoiError, SettlementRecord, UNKNOWN_NAME, find_nearby};
pub use crate::render::{RenderError, feature_collection, write_html_map};
pub use crate::types::{BoundingBox, GeoPoint, TypeError};

#[derive(Error, Debug)]
pub enum RoadsideError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("None of the waypoints could be resolved to a location")]
    NoWaypointsResolved,
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Service client error")]
    Service(#[from] service::ServiceError),
    #[error("Map rendering error")]
    Render(#[from] render::RenderError),
}

pub type Result<T> = std::result::Result<T, RoadsideError>;

/// Find the towns along a route and write them to an HTML map.
///
/// Resolves, routes and searches with the OpenStreetMap service clients
/// configured by `http_options`, then writes the map to the output returned
/// by `open_output`. The enrichment is returned so the caller can report on
/// it, including any waypoints, legs or searches that had to be skipped.
///
/// `open_output` is only called once there is a map to write, so a run that
/// fails outright leaves no empty output behind. It should probably return a
/// buffered `Write`.
pub fn map_route<W, F>(
    options: &EnrichmentOptions,
    http_options: &HttpOptions,
    open_output: F,
) -> Result<RouteEnrichment>
where
    W: Write,
    F: FnOnce() -> std::io::Result<W>,
{
    let geocoder = osm::NominatimGeocoder::new(http_options)?;
    let router = osm::OsrmRouter::new(http_options)?;
    let poi_query = osm::OverpassPoiQuery::new(http_options)?;

    map_route_with(options, &geocoder, &router, &poi_query, open_output)
}

/// Like [`map_route`], but with the given service collaborators.
pub fn map_route_with<G, R, Q, W, F>(
    options: &EnrichmentOptions,
    geocoder: &G,
    router: &R,
    poi_query: &Q,
    open_output: F,
) -> Result<RouteEnrichment>
where
    G: service::Geocoder + ?Sized,
    R: service::Router + ?Sized,
    Q: service::PoiQuery + ?Sized,
    W: Write,
    F: FnOnce() -> std::io::Result<W>,
{
    let enrichment = enrich_route(options, geocoder, router, poi_query)?;
    let html_output = open_output()?;
    render::write_html_map(&enrichment, Utc::now(), html_output)?;
    info!(
        "Mapped {} legs with {} settlements",
        enrichment.legs.len(),
        enrichment.settlements().count()
    );
    Ok(enrichment)
}
