//! Text summary of an enrichment run

use std::fmt::{Display, Write};

use dimensioned::si::Meter;

use crate::pipeline::RouteEnrichment;

/// Summarize an enrichment as text
///
/// Distances are shown in the unit `T`, for example [`crate::Kilometers`].
pub fn enrichment_report<T>(enrichment: &RouteEnrichment) -> Result<String, std::fmt::Error>
where
    T: From<Meter<f64>> + Display,
{
    let mut r = String::new();

    writeln!(&mut r, "Waypoints:")?;
    for waypoint in &enrichment.waypoints {
        writeln!(&mut r, "  {} {}", waypoint.label(), waypoint.point)?;
    }

    for leg in &enrichment.legs {
        let from = enrichment.waypoints[leg.start].label();
        let to = enrichment.waypoints[leg.end].label();
        writeln!(
            &mut r,
            "\n{} to {}: {} ({} sample points)",
            from,
            to,
            T::from(leg.distance()),
            leg.searches.len()
        )?;
        for search in &leg.searches {
            for settlement in &search.settlements {
                writeln!(
                    &mut r,
                    "  Town found: {} ({} from {})",
                    settlement.name,
                    T::from(settlement.distance),
                    search.point
                )?;
            }
        }
    }

    if !enrichment.issues.is_empty() {
        writeln!(&mut r, "\nSkipped:")?;
        for issue in &enrichment.issues {
            writeln!(&mut r, "  {}", issue.describe())?;
        }
    }

    Ok(r)
}
