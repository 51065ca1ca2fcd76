//! Route enrichment pipeline
//!
//! Ties the pieces together: resolves each waypoint's name, fetches a route for
//! each leg between consecutive waypoints, samples the route, and searches for
//! settlements around each sample point. The result is a [`RouteEnrichment`]
//! holding everything needed to draw the map.
//!
//! Most failures are local to a waypoint, leg or sample point. They are
//! recorded as [`PipelineIssue`]s and the pipeline carries on with whatever
//! remains. Only failing to resolve any waypoint at all is fatal.

use dimensioned::f64prefixes::KILO;
use dimensioned::si::{M, Meter};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::algorithm::sample_route;
use crate::geographic::polyline_length;
use crate::poi::{PoiError, SettlementRecord, find_nearby};
use crate::service::{Geocoder, PoiQuery, Router, ServiceError};
use crate::types::GeoPoint;
use crate::{Result, RoadsideError};

/// Options for [`enrich_route`].
#[derive(Clone, Debug)]
pub struct EnrichmentOptions {
    /// Place names to visit, in order.
    pub waypoints: Vec<String>,

    /// Distance traveled between settlement searches.
    pub sample_interval: Meter<f64>,

    /// Diameter of the circle searched around each sample point.
    pub search_diameter: Meter<f64>,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            sample_interval: 100.0 * KILO * M,
            search_diameter: 125.0 * KILO * M,
        }
    }
}

impl EnrichmentOptions {
    pub fn with_waypoints<I, S>(self, waypoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            waypoints: waypoints.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_sample_interval(self, sample_interval: Meter<f64>) -> Self {
        Self {
            sample_interval,
            ..self
        }
    }

    pub fn with_search_diameter(self, search_diameter: Meter<f64>) -> Self {
        Self {
            search_diameter,
            ..self
        }
    }

    fn validate(&self) -> Result<()> {
        // Negated comparisons so that NaN is rejected too.
        if !(self.sample_interval > 0.0 * M) {
            return Err(RoadsideError::InvalidOption(format!(
                "sample interval must be positive, got {}",
                self.sample_interval
            )));
        }
        if !(self.search_diameter > 0.0 * M) {
            return Err(RoadsideError::InvalidOption(format!(
                "search diameter must be positive, got {}",
                self.search_diameter
            )));
        }
        Ok(())
    }
}

/// A problem that caused part of the route to be skipped.
#[derive(Error, Debug)]
pub enum PipelineIssue {
    #[error("no location found for {place:?}")]
    WaypointNotFound { place: String },
    #[error("looking up {place:?} failed")]
    WaypointLookupFailed {
        place: String,
        #[source]
        error: ServiceError,
    },
    #[error("no route found from {from:?} to {to:?}")]
    RouteNotFound { from: String, to: String },
    #[error("fetching the route from {from:?} to {to:?} failed")]
    RouteLookupFailed {
        from: String,
        to: String,
        #[source]
        error: ServiceError,
    },
    #[error("settlement search at sample {sample} of leg {leg} ({point}) failed")]
    PoiQueryFailed {
        leg: usize,
        sample: usize,
        point: GeoPoint,
        #[source]
        error: PoiError,
    },
}

impl PipelineIssue {
    /// The issue followed by its chain of underlying causes.
    pub fn describe(&self) -> String {
        let mut description = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(error) = source {
            description.push_str(": ");
            description.push_str(&error.to_string());
            source = error.source();
        }
        description
    }
}

/// A waypoint whose place name was resolved to a position.
#[derive(Clone, PartialEq, Debug)]
pub struct Waypoint {
    /// The place name as given.
    pub place: String,

    /// Position of the place.
    pub point: GeoPoint,
}

impl Waypoint {
    /// A short label for the waypoint: its place name up to the first comma.
    pub fn label(&self) -> &str {
        self.place.split(',').next().unwrap_or_default().trim()
    }
}

/// The settlements found around one sample point.
#[derive(Clone, PartialEq, Debug)]
pub struct SampleSearch {
    /// The sample point searched around.
    pub point: GeoPoint,

    /// Settlements in range, in the order the POI query returned them.
    pub settlements: Vec<SettlementRecord>,
}

/// The route between two consecutive resolved waypoints.
#[derive(Clone, PartialEq, Debug)]
pub struct Leg {
    /// Index of the starting waypoint in [`RouteEnrichment::waypoints`].
    pub start: usize,

    /// Index of the ending waypoint.
    pub end: usize,

    /// The driving route, latitude first.
    pub polyline: Vec<GeoPoint>,

    /// Settlement searches at each successful sample point along the route.
    pub searches: Vec<SampleSearch>,
}

impl Leg {
    /// Geodesic length of the leg's route.
    pub fn distance(&self) -> Meter<f64> {
        polyline_length(&self.polyline)
    }
}

/// The output of [`enrich_route`].
#[derive(Debug, Default)]
pub struct RouteEnrichment {
    /// Waypoints that could be resolved, in route order.
    pub waypoints: Vec<Waypoint>,

    /// Legs for which a route was found, in route order.
    pub legs: Vec<Leg>,

    /// Everything that was skipped along the way.
    pub issues: Vec<PipelineIssue>,
}

impl RouteEnrichment {
    /// All settlements found, by leg and then by sample point.
    ///
    /// Settlements within range of more than one sample point appear once
    /// for each of them.
    pub fn settlements(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.legs
            .iter()
            .flat_map(|leg| leg.searches.iter())
            .flat_map(|search| search.settlements.iter())
    }
}

/// Find the settlements along a route through the given waypoints
///
/// Resolves `options.waypoints` with `geocoder`, then for each pair of
/// consecutive resolved waypoints fetches a route from `router`, samples it
/// every `options.sample_interval`, and searches `poi_query` for settlements
/// within `options.search_diameter` of each sample point.
///
/// Processing is sequential: waypoints, legs and sample points are each
/// handled one at a time in route order.
///
/// # Errors
///
/// Fails with [`RoadsideError::NoWaypointsResolved`] if not a single waypoint
/// could be resolved, or [`RoadsideError::InvalidOption`] for non-positive
/// distances. Any other failure is recorded in [`RouteEnrichment::issues`].
#[instrument(level = "trace", skip_all)]
pub fn enrich_route<G, R, Q>(
    options: &EnrichmentOptions,
    geocoder: &G,
    router: &R,
    poi_query: &Q,
) -> Result<RouteEnrichment>
where
    G: Geocoder + ?Sized,
    R: Router + ?Sized,
    Q: PoiQuery + ?Sized,
{
    options.validate()?;
    let mut enrichment = RouteEnrichment::default();

    resolve_waypoints(&mut enrichment, &options.waypoints, geocoder);
    if enrichment.waypoints.is_empty() {
        return Err(RoadsideError::NoWaypointsResolved);
    }
    info!(
        "Resolved {} of {} waypoints",
        enrichment.waypoints.len(),
        options.waypoints.len()
    );

    for start in 0..enrichment.waypoints.len() - 1 {
        let end = start + 1;
        let Some(polyline) = fetch_leg(&mut enrichment, start, end, router) else {
            continue;
        };

        let leg_index = enrichment.legs.len();
        let samples = sample_route(&polyline, options.sample_interval);
        debug!(
            "Leg {} from {:?} to {:?}: {} sample points",
            leg_index,
            enrichment.waypoints[start].label(),
            enrichment.waypoints[end].label(),
            samples.len()
        );

        let mut searches = Vec::new();
        for (sample_index, point) in samples.into_iter().enumerate() {
            match find_nearby(&point, options.search_diameter, poi_query) {
                Ok(settlements) => {
                    for settlement in &settlements {
                        info!("Town found: {}", settlement.name);
                    }
                    searches.push(SampleSearch { point, settlements });
                }
                Err(error) => {
                    let issue = PipelineIssue::PoiQueryFailed {
                        leg: leg_index,
                        sample: sample_index,
                        point,
                        error,
                    };
                    warn!("{}", issue.describe());
                    enrichment.issues.push(issue);
                }
            }
        }

        enrichment.legs.push(Leg {
            start,
            end,
            polyline,
            searches,
        });
    }

    Ok(enrichment)
}

fn resolve_waypoints<G>(enrichment: &mut RouteEnrichment, places: &[String], geocoder: &G)
where
    G: Geocoder + ?Sized,
{
    for place in places {
        match geocoder.geocode(place) {
            Ok(Some(point)) => enrichment.waypoints.push(Waypoint {
                place: place.clone(),
                point,
            }),
            Ok(None) => {
                let issue = PipelineIssue::WaypointNotFound {
                    place: place.clone(),
                };
                warn!("{}", issue.describe());
                enrichment.issues.push(issue);
            }
            Err(error) => {
                let issue = PipelineIssue::WaypointLookupFailed {
                    place: place.clone(),
                    error,
                };
                warn!("{}", issue.describe());
                enrichment.issues.push(issue);
            }
        }
    }
}

fn fetch_leg<R>(
    enrichment: &mut RouteEnrichment,
    start: usize,
    end: usize,
    router: &R,
) -> Option<Vec<GeoPoint>>
where
    R: Router + ?Sized,
{
    let from = &enrichment.waypoints[start];
    let to = &enrichment.waypoints[end];
    let issue = match router.route(&from.point, &to.point) {
        Ok(Some(polyline)) => return Some(polyline),
        Ok(None) => PipelineIssue::RouteNotFound {
            from: from.place.clone(),
            to: to.place.clone(),
        },
        Err(error) => PipelineIssue::RouteLookupFailed {
            from: from.place.clone(),
            to: to.place.clone(),
            error,
        },
    };
    warn!("{}", issue.describe());
    enrichment.issues.push(issue);
    None
}
