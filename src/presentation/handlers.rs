// HTTP request handlers
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::edit_mode::EditMode;
use crate::application::patrol_service::route_center;
use crate::domain::geometry::Waypoint;
use crate::error::PatrolError;
use crate::presentation::app_state::AppState;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub struct StateSummary {
    pub initialized: bool,
    pub clusters: usize,
    pub tasks: usize,
    pub incidents: usize,
    pub cameras: usize,
}

/// Readiness flag and per-collection record counts.
pub async fn read_state(State(state): State<Arc<AppState>>) -> Json<StateSummary> {
    let tree = state.aggregator.state();
    Json(StateSummary {
        initialized: tree.initialized,
        clusters: tree.clusters.len(),
        tasks: tree.tasks.len(),
        incidents: tree.incidents.len(),
        cameras: tree.cameras.len(),
    })
}

/// All tasks grouped by cluster and status, with compliance percentages.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Response {
    Json(state.patrol_service.grouped_tasks()).into_response()
}

/// Full record for one task, mock detections included.
pub async fn task_details(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let tree = state.aggregator.state();
    match tree.tasks.iter().find(|t| t.id == id) {
        Some(task) => Json(task).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Deserialize)]
pub struct ComplianceQuery {
    pub tolerance: Option<f64>,
}

/// Visited-waypoint set and percentage for one task.
pub async fn task_compliance(
    Path(id): Path<String>,
    Query(query): Query<ComplianceQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.patrol_service.compliance_for(&id, query.tolerance) {
        Some(report) => Json(report).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Serialize)]
pub struct SelectTaskResponse {
    pub center: Option<Waypoint>,
    pub zoom: u8,
}

/// Give a task map focus: record the selection, refresh the route overlay
/// and report where the map should center.
pub async fn select_task(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let tree = state.aggregator.state();
    let Some(task) = tree.tasks.iter().find(|t| t.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    {
        let mut selection = state.selection.lock().unwrap();
        selection.clear();
        selection.task_id = Some(task.id.clone());
    }
    state.overlay.lock().unwrap().sync_selected_task(Some(task));

    Json(SelectTaskResponse {
        center: route_center(&task.assigned_route).ok(),
        zoom: 17,
    })
    .into_response()
}

#[derive(Serialize)]
pub struct EditView {
    pub mode: EditMode,
    pub buffer: Vec<Waypoint>,
}

pub async fn edit_view(State(state): State<Arc<AppState>>) -> Json<EditView> {
    let controller = state.edit_controller.lock().await;
    Json(EditView {
        mode: controller.mode(),
        buffer: controller.buffer().to_vec(),
    })
}

pub async fn enter_camera_editing(State(state): State<Arc<AppState>>) -> Json<EditView> {
    let mut controller = state.edit_controller.lock().await;
    controller.enter_camera_editing();
    Json(EditView {
        mode: controller.mode(),
        buffer: Vec::new(),
    })
}

#[derive(Deserialize)]
pub struct EnterPatrolPointsRequest {
    /// Existing cluster whose geometry is being edited; absent for a new one.
    pub cluster_id: Option<String>,
}

pub async fn enter_patrol_points_editing(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnterPatrolPointsRequest>,
) -> Response {
    let tree = state.aggregator.state();
    let existing = match &request.cluster_id {
        Some(id) => match tree.clusters.iter().find(|c| c.id == *id) {
            Some(cluster) => Some(cluster),
            None => return StatusCode::NOT_FOUND.into_response(),
        },
        None => None,
    };

    let mut controller = state.edit_controller.lock().await;
    controller.enter_patrol_points_editing(existing);
    Json(EditView {
        mode: controller.mode(),
        buffer: controller.buffer().to_vec(),
    })
    .into_response()
}

pub async fn add_edit_point(
    State(state): State<Arc<AppState>>,
    Json(point): Json<Waypoint>,
) -> Response {
    let mut controller = state.edit_controller.lock().await;
    match controller.add_point(point) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn remove_edit_point(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mut controller = state.edit_controller.lock().await;
    match controller.remove_point(index) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn commit_edit(State(state): State<Arc<AppState>>) -> Response {
    let mut controller = state.edit_controller.lock().await;
    match controller.commit().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn cancel_edit(State(state): State<Arc<AppState>>) -> StatusCode {
    state.edit_controller.lock().await.cancel();
    StatusCode::NO_CONTENT
}

fn error_response(err: PatrolError) -> Response {
    let status = match &err {
        PatrolError::InvalidState(_) => StatusCode::CONFLICT,
        PatrolError::Write { .. } => StatusCode::BAD_GATEWAY,
        PatrolError::Sync { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PatrolError::GeometryUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, err.to_string()).into_response()
}
