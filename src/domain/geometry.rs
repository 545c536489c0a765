// Geometric primitives for patrol routes
use serde::{Deserialize, Serialize};

/// Earth's mean radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single assigned patrol coordinate. Two waypoints are the same point
/// exactly when their coordinates match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Bit-exact key for value-based dedup of floating point coordinates.
    pub(crate) fn bits(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lng.to_bits())
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// One timestamped coordinate recorded from an agent's actual movement.
/// `coordinates` is `[lat, lng]`; `timestamp` is milliseconds since epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub coordinates: [f64; 2],
    pub timestamp: i64,
}

impl TracePoint {
    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.coordinates[0], self.coordinates[1])
    }
}

/// Great-circle (haversine) distance between two points in meters.
/// Returns `None` when any coordinate is non-finite.
pub fn great_circle_distance(a: &Waypoint, b: &Waypoint) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }

    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    Some(EARTH_RADIUS_M * 2.0 * h.sqrt().asin())
}

/// Distance in meters from `p` to the segment `a`-`b`.
///
/// Uses a local equirectangular projection centered on `p`, which is accurate
/// for the short segments a patrol trace produces. Returns `None` when any
/// coordinate is non-finite.
pub fn point_to_segment_distance(p: &Waypoint, a: &Waypoint, b: &Waypoint) -> Option<f64> {
    if !p.is_finite() || !a.is_finite() || !b.is_finite() {
        return None;
    }

    let cos_lat = p.lat.to_radians().cos();
    let project = |w: &Waypoint| {
        (
            (w.lng - p.lng).to_radians() * cos_lat * EARTH_RADIUS_M,
            (w.lat - p.lat).to_radians() * EARTH_RADIUS_M,
        )
    };

    // `p` projects to the origin
    let (ax, ay) = project(a);
    let (bx, by) = project(b);

    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;

    let t = if len2 == 0.0 {
        0.0
    } else {
        ((-ax * dx - ay * dy) / len2).clamp(0.0, 1.0)
    };

    let cx = ax + t * dx;
    let cy = ay + t * dy;

    Some((cx * cx + cy * cy).sqrt())
}

/// Minimum distance in meters from `p` to a piecewise-linear path.
/// A single-point path degenerates to a point distance; an empty path (or any
/// non-finite input) yields `None`.
pub fn point_to_polyline_distance(p: &Waypoint, line: &[Waypoint]) -> Option<f64> {
    match line {
        [] => None,
        [only] => great_circle_distance(p, only),
        _ => line
            .windows(2)
            .filter_map(|w| point_to_segment_distance(p, &w[0], &w[1]))
            .min_by(|a, b| a.total_cmp(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_great_circle_distance_small_offset() {
        // 0.0001 degrees of latitude is roughly 11.1 meters
        let a = Waypoint::new(0.0, 0.0);
        let b = Waypoint::new(0.0001, 0.0);
        let d = great_circle_distance(&a, &b).unwrap();
        assert!((d - 11.1).abs() < 0.2, "got {}", d);
    }

    #[test]
    fn test_great_circle_distance_zero() {
        let a = Waypoint::new(-6.2, 106.8);
        assert_eq!(great_circle_distance(&a, &a), Some(0.0));
    }

    #[test]
    fn test_non_finite_coordinates_yield_none() {
        let a = Waypoint::new(f64::NAN, 0.0);
        let b = Waypoint::new(0.0, 0.0);
        assert_eq!(great_circle_distance(&a, &b), None);
        assert_eq!(point_to_segment_distance(&a, &b, &b), None);
    }

    #[test]
    fn test_point_to_segment_interior() {
        // Waypoint sits perpendicular to the middle of a ~22m segment; a
        // vertex-only test would report ~11m to either endpoint
        let p = Waypoint::new(0.00005, 0.00005);
        let a = Waypoint::new(0.0, 0.0);
        let b = Waypoint::new(0.0001, 0.0);
        let d = point_to_segment_distance(&p, &a, &b).unwrap();
        assert!((d - 5.6).abs() < 0.2, "got {}", d);
    }

    #[test]
    fn test_point_to_segment_clamps_to_endpoint() {
        let p = Waypoint::new(0.0002, 0.0);
        let a = Waypoint::new(0.0, 0.0);
        let b = Waypoint::new(0.0001, 0.0);
        let d = point_to_segment_distance(&p, &a, &b).unwrap();
        let to_b = great_circle_distance(&p, &b).unwrap();
        assert!((d - to_b).abs() < 0.1, "got {} vs {}", d, to_b);
    }

    #[test]
    fn test_polyline_distance_empty_and_single() {
        let p = Waypoint::new(0.0, 0.0);
        assert_eq!(point_to_polyline_distance(&p, &[]), None);

        let single = [Waypoint::new(0.0001, 0.0)];
        let d = point_to_polyline_distance(&p, &single).unwrap();
        assert!((d - 11.1).abs() < 0.2);
    }
}
