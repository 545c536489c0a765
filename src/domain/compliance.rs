// Patrol compliance verification - which assigned waypoints were visited
use std::collections::HashSet;

use super::geometry::{great_circle_distance, point_to_polyline_distance, Waypoint};
use super::patrol::{RoutePath, VisitedPoint};

/// Order a route path's trace points into a polyline.
///
/// Store keys carry no ordering guarantee, so the recorded timestamp is the
/// only reliable ordering. Ties keep an arbitrary but deterministic order.
pub fn path_polyline(route_path: &RoutePath) -> Vec<Waypoint> {
    let mut trace: Vec<_> = route_path.values().collect();
    trace.sort_by_key(|t| t.timestamp);
    trace.iter().map(|t| t.waypoint()).collect()
}

/// Decide which assigned waypoints were visited, and when.
///
/// The result is a set keyed by waypoint value: duplicate waypoints in the
/// assigned route are processed once, and waypoints outside tolerance are
/// simply absent. Proximity is tested against the recorded path's segments,
/// not only its vertices, since the actual movement between two fixes is
/// piecewise-linear. Returns an empty set when the path is absent or empty,
/// or when geometry degrades on non-finite coordinates.
pub fn compute_visited(
    assigned_route: &[Waypoint],
    route_path: Option<&RoutePath>,
    tolerance_meters: f64,
) -> Vec<VisitedPoint> {
    let Some(path) = route_path else {
        return Vec::new();
    };
    if path.is_empty() {
        return Vec::new();
    }

    let polyline = path_polyline(path);
    let trace: Vec<_> = path.values().collect();

    let mut seen = HashSet::new();
    let mut visited = Vec::new();

    for waypoint in assigned_route {
        if !seen.insert(waypoint.bits()) {
            continue;
        }

        let Some(distance) = point_to_polyline_distance(waypoint, &polyline) else {
            continue;
        };
        if distance > tolerance_meters {
            continue;
        }

        // The visit time comes from the single nearest trace point, and only
        // when that point is itself within tolerance of the waypoint.
        let timestamp = trace
            .iter()
            .filter_map(|t| {
                great_circle_distance(waypoint, &t.waypoint()).map(|d| (d, t.timestamp))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .and_then(|(d, ts)| (d <= tolerance_meters).then_some(ts));

        visited.push(VisitedPoint {
            lat: waypoint.lat,
            lng: waypoint.lng,
            timestamp,
        });
    }

    visited
}

/// Visited percentage, rounded to the nearest integer. An empty assigned
/// route is 0, never a division by zero.
pub fn compliance_percent(visited_count: usize, assigned_count: usize) -> u32 {
    if assigned_count == 0 {
        return 0;
    }
    (visited_count as f64 / assigned_count as f64 * 100.0).round() as u32
}

/// Vertex-to-vertex intersection count, short-circuiting on the first trace
/// point within `radius_meters` of each waypoint.
#[deprecated(
    note = "vertex-only heuristic misses waypoints passed between two fixes; use compute_visited"
)]
pub fn count_intersections(
    assigned_route: &[Waypoint],
    route_path: Option<&RoutePath>,
    radius_meters: f64,
) -> usize {
    let Some(path) = route_path else {
        return 0;
    };

    let mut seen = HashSet::new();
    let mut count = 0;

    for waypoint in assigned_route {
        if !seen.insert(waypoint.bits()) {
            continue;
        }

        for trace in path.values() {
            match great_circle_distance(waypoint, &trace.waypoint()) {
                Some(d) if d <= radius_meters => {
                    count += 1;
                    break;
                }
                _ => {}
            }
        }
    }

    count
}
