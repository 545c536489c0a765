// Application state for HTTP handlers
use std::sync::{Arc, Mutex};

use crate::application::aggregator::RemoteSyncAggregator;
use crate::application::edit_mode::EditModeController;
use crate::application::overlay::OverlayLifecycleManager;
use crate::application::patrol_service::PatrolService;
use crate::application::selection::Selection;

pub struct AppState {
    pub aggregator: Arc<RemoteSyncAggregator>,
    pub patrol_service: PatrolService,
    pub selection: Arc<Mutex<Selection>>,
    pub overlay: Arc<Mutex<OverlayLifecycleManager>>,
    /// Held across the async commit write, hence a tokio mutex.
    pub edit_controller: tokio::sync::Mutex<EditModeController>,
}
