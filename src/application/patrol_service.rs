// Patrol read-model queries - task summaries, grouping, compliance reports
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::aggregator::{MapState, RemoteSyncAggregator};
use crate::domain::compliance::{compliance_percent, compute_visited};
use crate::domain::geometry::Waypoint;
use crate::domain::patrol::{PatrolTask, TaskStatus, Timeliness, VisitedPoint};
use crate::error::PatrolError;

#[derive(Debug, Clone, Serialize)]
pub struct OfficerDetails {
    pub name: String,
    pub kind: String,
    pub shift: String,
}

impl OfficerDetails {
    fn unknown() -> Self {
        Self {
            name: "Unknown".into(),
            kind: "Unknown".into(),
            shift: "Unknown".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub cluster_name: String,
    pub officer: OfficerDetails,
    pub status: TaskStatus,
    pub timeliness: Timeliness,
    pub visited_count: usize,
    pub total_points: usize,
    pub percent: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_km: Option<f64>,
    pub mock_location_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusGroup {
    pub label: String,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterGroup {
    pub cluster_name: String,
    pub count: usize,
    pub statuses: Vec<StatusGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub task_id: String,
    pub tolerance_meters: f64,
    pub visited: Vec<VisitedPoint>,
    pub total_points: usize,
    pub percent: u32,
}

#[derive(Clone)]
pub struct PatrolService {
    aggregator: Arc<RemoteSyncAggregator>,
    tolerance_meters: f64,
}

impl PatrolService {
    pub fn new(aggregator: Arc<RemoteSyncAggregator>, tolerance_meters: f64) -> Self {
        Self {
            aggregator,
            tolerance_meters,
        }
    }

    /// Compliance for one task, with an optional per-request tolerance.
    pub fn compliance_for(&self, task_id: &str, tolerance: Option<f64>) -> Option<ComplianceReport> {
        compliance_report(
            &self.aggregator.state(),
            task_id,
            tolerance.unwrap_or(self.tolerance_meters),
        )
    }

    /// All tasks grouped by cluster, then by status; finished tasks group
    /// under their timeliness. Groups order on-time before late before
    /// unknown; tasks within a group are newest first.
    pub fn grouped_tasks(&self) -> Vec<ClusterGroup> {
        grouped_tasks(&self.aggregator.state(), self.tolerance_meters)
    }
}

fn compliance_report(state: &MapState, task_id: &str, tolerance: f64) -> Option<ComplianceReport> {
    let task = state.tasks.iter().find(|t| t.id == task_id)?;
    let visited = compute_visited(&task.assigned_route, task.route_path.as_ref(), tolerance);
    Some(ComplianceReport {
        task_id: task.id.clone(),
        tolerance_meters: tolerance,
        percent: compliance_percent(visited.len(), task.assigned_route.len()),
        total_points: task.assigned_route.len(),
        visited,
    })
}

fn grouped_tasks(state: &MapState, tolerance_meters: f64) -> Vec<ClusterGroup> {
    let mut by_cluster: BTreeMap<String, BTreeMap<(u8, String), Vec<TaskSummary>>> =
        BTreeMap::new();

    for task in &state.tasks {
        let summary = summarize(task, state, tolerance_meters);
        let cluster_name = summary.cluster_name.clone();
        let group_key = group_key(task);
        by_cluster
            .entry(cluster_name)
            .or_default()
            .entry(group_key)
            .or_default()
            .push(summary);
    }

    by_cluster
        .into_iter()
        .map(|(cluster_name, statuses)| {
            let count = statuses.values().map(Vec::len).sum();
            let statuses = statuses
                .into_iter()
                .map(|((_, label), mut tasks)| {
                    tasks.sort_by(|a, b| b.start_time.cmp(&a.start_time));
                    StatusGroup { label, tasks }
                })
                .collect();
            ClusterGroup {
                cluster_name,
                count,
                statuses,
            }
        })
        .collect()
}

fn summarize(task: &PatrolTask, state: &MapState, tolerance_meters: f64) -> TaskSummary {
    let visited = compute_visited(
        &task.assigned_route,
        task.route_path.as_ref(),
        tolerance_meters,
    );

    TaskSummary {
        id: task.id.clone(),
        cluster_name: task
            .cluster_name
            .clone()
            .unwrap_or_else(|| "Unknown Cluster".into()),
        officer: officer_details(state, &task.cluster_id, &task.user_id),
        status: task.status,
        timeliness: task.timeliness,
        percent: compliance_percent(visited.len(), task.assigned_route.len()),
        visited_count: visited.len(),
        total_points: task.assigned_route.len(),
        start_time: task.start_time,
        end_time: task.end_time,
        distance_km: task.distance_km,
        mock_location_count: task.mock_location_count,
    }
}

/// Resolve the officer a task belongs to through its cluster, with explicit
/// unknown fallbacks for dangling references.
pub fn officer_details(state: &MapState, cluster_id: &str, user_id: &str) -> OfficerDetails {
    state
        .clusters
        .iter()
        .find(|c| c.id == cluster_id)
        .and_then(|c| c.officers.iter().find(|o| o.id == user_id))
        .map(|o| OfficerDetails {
            name: o.name.clone(),
            kind: o.kind.label().to_string(),
            shift: o.shift.label().to_string(),
        })
        .unwrap_or_else(OfficerDetails::unknown)
}

/// Arithmetic centroid of an assigned route, used to center the map on a
/// task. Degrades to an error instead of producing a NaN center.
pub fn route_center(assigned_route: &[Waypoint]) -> Result<Waypoint, PatrolError> {
    if assigned_route.is_empty() || assigned_route.iter().any(|w| !w.is_finite()) {
        return Err(PatrolError::GeometryUnavailable);
    }

    let n = assigned_route.len() as f64;
    Ok(Waypoint::new(
        assigned_route.iter().map(|w| w.lat).sum::<f64>() / n,
        assigned_route.iter().map(|w| w.lng).sum::<f64>() / n,
    ))
}

/// Finished tasks group under their timeliness; everything else groups under
/// its status. On-time sorts before late, late before unknown, and the
/// non-finished statuses trail behind.
fn group_key(task: &PatrolTask) -> (u8, String) {
    if task.status == TaskStatus::Finished {
        let rank = match task.timeliness {
            Timeliness::Ontime => 1,
            Timeliness::Late => 2,
            Timeliness::Unknown => 3,
        };
        (rank, task.timeliness.label().into())
    } else {
        let label = match task.status {
            TaskStatus::Active => "Active",
            TaskStatus::Ongoing => "Ongoing",
            TaskStatus::Expired => "Expired",
            TaskStatus::Cancelled => "Cancelled",
            TaskStatus::Finished => unreachable!(),
        };
        (99, label.into())
    }
}
