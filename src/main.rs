// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::application::aggregator::RemoteSyncAggregator;
use crate::application::edit_mode::EditModeController;
use crate::application::overlay::OverlayLifecycleManager;
use crate::application::patrol_service::PatrolService;
use crate::application::selection::Selection;
use crate::infrastructure::config::{load_engine_config, load_store_config};
use crate::infrastructure::rest_store::RestLiveStore;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_edit_point, cancel_edit, commit_edit, edit_view, enter_camera_editing,
    enter_patrol_points_editing, health_check, list_tasks, read_state, remove_edit_point,
    select_task, task_compliance, task_details,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let store_config = load_store_config()?;
    let engine_config = load_engine_config()?;

    // Create the live store client (infrastructure layer)
    let store = Arc::new(RestLiveStore::new(
        store_config.store.base_url,
        store_config.store.auth_token,
    ));

    // Create the aggregator and start watching (application layer)
    let aggregator = Arc::new(RemoteSyncAggregator::new(store.clone()));
    aggregator.attach();

    let selection = Arc::new(Mutex::new(Selection::default()));
    // No rendering surface in the service process: overlay calls defer until
    // a map UI attaches one.
    let overlay = Arc::new(Mutex::new(OverlayLifecycleManager::new()));
    let edit_controller =
        EditModeController::new(store.clone(), selection.clone(), overlay.clone());

    let patrol_service =
        PatrolService::new(aggregator.clone(), engine_config.engine.tolerance_meters);

    // Create application state
    let state = Arc::new(AppState {
        aggregator: aggregator.clone(),
        patrol_service,
        selection,
        overlay,
        edit_controller: tokio::sync::Mutex::new(edit_controller),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(read_state))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(task_details))
        .route("/tasks/:id/compliance", get(task_compliance))
        .route("/tasks/:id/select", post(select_task))
        .route("/edit", get(edit_view))
        .route("/edit/cameras", post(enter_camera_editing))
        .route("/edit/patrol-points", post(enter_patrol_points_editing))
        .route("/edit/points", post(add_edit_point))
        .route("/edit/points/:index", delete(remove_edit_point))
        .route("/edit/commit", post(commit_edit))
        .route("/edit/cancel", post(cancel_edit))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = engine_config.engine.listen_addr.parse()?;
    println!("Starting patrol-ops service on {}", addr);

    let result = axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await;

    // Stop the watchers before exiting
    aggregator.detach();
    result?;

    Ok(())
}
