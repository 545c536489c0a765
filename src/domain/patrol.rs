// Patrol domain models
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geometry::{TracePoint, Waypoint};

/// Actual recorded movement for a task, keyed by store-assigned identifiers.
/// Key order carries no meaning; consumers order by trace timestamp.
pub type RoutePath = HashMap<String, TracePoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Ongoing,
    Finished,
    Expired,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses are never re-opened.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Expired | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeliness {
    Ontime,
    Late,
    #[default]
    Unknown,
}

impl Timeliness {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ontime => "On Time",
            Self::Late => "Late",
            Self::Unknown => "Unknown Timeliness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfficerKind {
    Outsource,
    Organik,
}

impl OfficerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Outsource => "Outsource",
            Self::Organik => "Organik",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Pagi,
    Siang,
    Sore,
    Malam,
    MalamPanjang,
}

impl Shift {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pagi => "Pagi (07:00 - 15:00)",
            Self::Siang => "Siang (07:00 - 19:00)",
            Self::Sore => "Sore (15:00 - 23:00)",
            Self::Malam => "Malam (23:00 - 07:00)",
            Self::MalamPanjang => "Malam (19:00 - 07:00)",
        }
    }

    /// Shift window as (start, end), wall-clock HH:MM.
    pub fn window(&self) -> (&'static str, &'static str) {
        match self {
            Self::Pagi => ("07:00", "15:00"),
            Self::Siang => ("07:00", "19:00"),
            Self::Sore => ("15:00", "23:00"),
            Self::Malam => ("23:00", "07:00"),
            Self::MalamPanjang => ("19:00", "07:00"),
        }
    }
}

/// One scheduled patrol assignment. Created externally with status `active`;
/// moves to `ongoing` once the route path starts receiving points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatrolTask {
    pub id: String,
    pub cluster_id: String,
    pub cluster_name: Option<String>,
    pub user_id: String,
    pub officer_name: Option<String>,
    pub assigned_route: Vec<Waypoint>,
    pub route_path: Option<RoutePath>,
    pub status: TaskStatus,
    pub timeliness: Timeliness,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Trace points flagged as spoofed/simulated locations.
    pub mock_detections: HashMap<String, TracePoint>,
    pub distance_km: Option<f64>,
    pub mock_location_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Officer {
    pub id: String,
    pub name: String,
    pub kind: OfficerKind,
    pub shift: Shift,
}

/// A named patrol area with its boundary points and assigned officers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub cluster_coordinates: Vec<Waypoint>,
    pub officers: Vec<Officer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub id: String,
    pub title: Option<String>,
    pub cluster_name: Option<String>,
    /// Weak back-reference to the task this was reported under.
    pub task_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub lat: f64,
    pub lng: f64,
    pub photo_urls: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraMarker {
    pub id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// A confirmed visit to one assigned waypoint. Derived, never persisted.
/// The timestamp is the recording time of the nearest trace point, present
/// only when that nearest point is itself within tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitedPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_and_terminality() {
        let status: TaskStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(status, TaskStatus::Finished);
        assert!(status.is_terminal());
        assert!(!TaskStatus::Ongoing.is_terminal());
    }

    #[test]
    fn test_shift_wire_names() {
        let shift: Shift = serde_json::from_str("\"malam_panjang\"").unwrap();
        assert_eq!(shift, Shift::MalamPanjang);
        assert_eq!(shift.window(), ("19:00", "07:00"));
    }

    #[test]
    fn test_timeliness_labels() {
        assert_eq!(Timeliness::Ontime.label(), "On Time");
        assert_eq!(Timeliness::default(), Timeliness::Unknown);
    }
}
