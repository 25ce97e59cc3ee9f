//! Route geometry mapper - site sequence to map coordinates

use crate::domain::route::{RouteGeometry, RouteResult};
use crate::domain::site::SiteRegistry;
use tracing::debug;

/// Map a route result onto registry coordinates.
///
/// Ids missing from the registry are left out of `coordinates` but kept in
/// `labels`. The cost is copied as-is (seconds). Pure and deterministic.
pub fn map_to_geometry(registry: &SiteRegistry, result: &RouteResult) -> RouteGeometry {
    let coordinates: Vec<_> =
        result.site_sequence.iter().filter_map(|id| registry.coordinate(id.as_str())).collect();

    let dropped = result.site_sequence.len() - coordinates.len();
    if dropped > 0 {
        debug!(
            dropped = %dropped,
            path_len = %result.site_sequence.len(),
            "route_geometry_gap"
        );
    }

    RouteGeometry { coordinates, cost: result.total_cost, labels: result.site_sequence.clone() }
}
