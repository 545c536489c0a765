// Edit mode controller - exclusive editing of shared geometry
use std::sync::{Arc, Mutex};

use crate::application::live_store::LiveStore;
use crate::application::overlay::OverlayLifecycleManager;
use crate::application::selection::Selection;
use crate::domain::geometry::Waypoint;
use crate::domain::patrol::Cluster;
use crate::error::PatrolError;

/// A patrol area needs at least a triangle.
pub const MIN_AREA_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EditMode {
    Idle,
    EditingCameras,
    EditingPatrolPoints,
}

/// Exclusive edit-mode state machine. At most one non-idle mode exists at a
/// time; entering an editing mode claims focus (buffer, selection and overlay
/// are all reset) and `commit`/`cancel` are the only ways back to idle.
pub struct EditModeController {
    store: Arc<dyn LiveStore>,
    selection: Arc<Mutex<Selection>>,
    overlay: Arc<Mutex<OverlayLifecycleManager>>,
    mode: EditMode,
    buffer: Vec<Waypoint>,
    /// Cluster id the patrol-points buffer commits to.
    target: Option<String>,
}

impl EditModeController {
    pub fn new(
        store: Arc<dyn LiveStore>,
        selection: Arc<Mutex<Selection>>,
        overlay: Arc<Mutex<OverlayLifecycleManager>>,
    ) -> Self {
        Self {
            store,
            selection,
            overlay,
            mode: EditMode::Idle,
            buffer: Vec::new(),
            target: None,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn buffer(&self) -> &[Waypoint] {
        &self.buffer
    }

    /// Claim exclusive focus: drop any previous transient buffer, clear the
    /// browse selection and take down the route overlay.
    fn begin(&mut self, mode: EditMode) {
        self.buffer.clear();
        self.target = None;
        self.selection.lock().unwrap().clear();
        self.overlay.lock().unwrap().clear_active_route();
        self.mode = mode;
    }

    pub fn enter_camera_editing(&mut self) {
        self.begin(EditMode::EditingCameras);
    }

    /// Start editing a cluster's patrol points. An existing cluster seeds the
    /// buffer with its current coordinates; a brand-new cluster starts empty
    /// and gets its commit target via [set_commit_target](Self::set_commit_target)
    /// once the cluster record exists.
    pub fn enter_patrol_points_editing(&mut self, existing: Option<&Cluster>) {
        self.begin(EditMode::EditingPatrolPoints);
        if let Some(cluster) = existing {
            self.buffer = cluster.cluster_coordinates.clone();
            self.target = Some(cluster.id.clone());
        }
    }

    pub fn set_commit_target(&mut self, cluster_id: String) {
        self.target = Some(cluster_id);
    }

    pub fn add_point(&mut self, point: Waypoint) -> Result<(), PatrolError> {
        if self.mode == EditMode::Idle {
            return Err(PatrolError::InvalidState(
                "no editing session is active".into(),
            ));
        }
        self.buffer.push(point);
        Ok(())
    }

    pub fn remove_point(&mut self, index: usize) -> Result<(), PatrolError> {
        if self.mode == EditMode::Idle {
            return Err(PatrolError::InvalidState(
                "no editing session is active".into(),
            ));
        }
        if index >= self.buffer.len() {
            return Err(PatrolError::InvalidState(format!(
                "point index {} out of range",
                index
            )));
        }
        self.buffer.remove(index);
        Ok(())
    }

    /// Validate the buffer and write it back with a single replace-at-key.
    /// On success the controller returns to idle. On a write failure the
    /// buffer and mode are preserved so the edit can be retried.
    pub async fn commit(&mut self) -> Result<(), PatrolError> {
        let path = match self.mode {
            EditMode::Idle => {
                return Err(PatrolError::InvalidState(
                    "commit outside an editing session".into(),
                ));
            }
            EditMode::EditingPatrolPoints => {
                if self.buffer.len() < MIN_AREA_POINTS {
                    return Err(PatrolError::InvalidState(format!(
                        "a patrol area needs at least {} points, buffer has {}",
                        MIN_AREA_POINTS,
                        self.buffer.len()
                    )));
                }
                let Some(cluster_id) = &self.target else {
                    return Err(PatrolError::InvalidState(
                        "no cluster selected to commit to".into(),
                    ));
                };
                format!("clusters/{}/cluster_coordinates", cluster_id)
            }
            EditMode::EditingCameras => {
                if self.buffer.is_empty() {
                    return Err(PatrolError::InvalidState(
                        "camera buffer is empty".into(),
                    ));
                }
                "cameras".to_string()
            }
        };

        let value = match self.mode {
            EditMode::EditingPatrolPoints => serde_json::to_value(
                self.buffer
                    .iter()
                    .map(|w| [w.lat, w.lng])
                    .collect::<Vec<_>>(),
            ),
            _ => serde_json::to_value(&self.buffer),
        }
        .map_err(|e| PatrolError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

        self.store.replace(&path, &value).await?;

        self.buffer.clear();
        self.target = None;
        self.mode = EditMode::Idle;
        Ok(())
    }

    /// Discard the buffer without writing anything.
    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.target = None;
        self.mode = EditMode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::live_store::{Snapshot, SnapshotStream};
    use async_trait::async_trait;
    use futures::stream;

    #[derive(Default)]
    struct WriteRecorder {
        writes: Mutex<Vec<(String, serde_json::Value)>>,
        fail_next: Mutex<bool>,
    }

    #[async_trait]
    impl LiveStore for WriteRecorder {
        fn watch(&self, _path: &str) -> SnapshotStream {
            Box::pin(stream::empty::<Result<Snapshot, PatrolError>>())
        }

        async fn replace(
            &self,
            path: &str,
            value: &serde_json::Value,
        ) -> Result<(), PatrolError> {
            if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
                return Err(PatrolError::Write {
                    path: path.to_string(),
                    message: "store unreachable".into(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((path.to_string(), value.clone()));
            Ok(())
        }
    }

    fn controller() -> (EditModeController, Arc<WriteRecorder>, Arc<Mutex<Selection>>) {
        let store = Arc::new(WriteRecorder::default());
        let selection = Arc::new(Mutex::new(Selection::default()));
        let overlay = Arc::new(Mutex::new(OverlayLifecycleManager::new()));
        (
            EditModeController::new(store.clone(), selection.clone(), overlay),
            store,
            selection,
        )
    }

    fn cluster() -> Cluster {
        Cluster {
            id: "c1".into(),
            name: "Alpha".into(),
            email: None,
            cluster_coordinates: vec![
                Waypoint::new(1.0, 1.0),
                Waypoint::new(1.0, 2.0),
                Waypoint::new(2.0, 2.0),
            ],
            officers: Vec::new(),
        }
    }

    #[test]
    fn test_entering_edit_clears_selection_and_buffer() {
        let (mut controller, _store, selection) = controller();
        selection.lock().unwrap().task_id = Some("t1".into());

        controller.enter_camera_editing();
        controller.add_point(Waypoint::new(0.0, 0.0)).unwrap();

        assert_eq!(controller.mode(), EditMode::EditingCameras);
        assert!(selection.lock().unwrap().is_empty());
        assert_eq!(controller.buffer().len(), 1);
    }

    #[test]
    fn test_switching_modes_discards_the_camera_buffer() {
        let (mut controller, _store, _selection) = controller();

        controller.enter_camera_editing();
        controller.add_point(Waypoint::new(0.0, 0.0)).unwrap();

        // direct transition, no idle stop in between
        controller.enter_patrol_points_editing(None);
        assert_eq!(controller.mode(), EditMode::EditingPatrolPoints);
        assert!(controller.buffer().is_empty());
    }

    #[test]
    fn test_existing_cluster_preloads_buffer() {
        let (mut controller, _store, _selection) = controller();
        let cluster = cluster();

        controller.enter_patrol_points_editing(Some(&cluster));
        assert_eq!(controller.buffer(), cluster.cluster_coordinates.as_slice());
    }

    #[tokio::test]
    async fn test_edit_remove_commit_scenario() {
        let (mut controller, store, _selection) = controller();
        controller.enter_patrol_points_editing(Some(&cluster()));

        controller.remove_point(1).unwrap();
        assert_eq!(
            controller.buffer(),
            &[Waypoint::new(1.0, 1.0), Waypoint::new(2.0, 2.0)]
        );

        // two points is below the area minimum
        let err = controller.commit().await.unwrap_err();
        assert!(matches!(err, PatrolError::InvalidState(_)));
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(controller.mode(), EditMode::EditingPatrolPoints);

        controller.add_point(Waypoint::new(2.0, 1.0)).unwrap();
        controller.commit().await.unwrap();

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "clusters/c1/cluster_coordinates");
        assert_eq!(
            writes[0].1,
            serde_json::json!([[1.0, 1.0], [2.0, 2.0], [2.0, 1.0]])
        );
        assert_eq!(controller.mode(), EditMode::Idle);
    }

    #[tokio::test]
    async fn test_cancel_never_writes() {
        let (mut controller, store, _selection) = controller();

        controller.enter_patrol_points_editing(Some(&cluster()));
        controller.add_point(Waypoint::new(9.0, 9.0)).unwrap();
        controller.cancel();

        assert_eq!(controller.mode(), EditMode::Idle);
        assert!(controller.buffer().is_empty());
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_preserves_the_buffer_for_retry() {
        let (mut controller, store, _selection) = controller();
        controller.enter_patrol_points_editing(Some(&cluster()));
        *store.fail_next.lock().unwrap() = true;

        let err = controller.commit().await.unwrap_err();
        assert!(matches!(err, PatrolError::Write { .. }));
        assert_eq!(controller.mode(), EditMode::EditingPatrolPoints);
        assert_eq!(controller.buffer().len(), 3);

        // retry succeeds and only then returns to idle
        controller.commit().await.unwrap();
        assert_eq!(controller.mode(), EditMode::Idle);
        assert_eq!(store.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_rejected_while_idle() {
        let (mut controller, _store, _selection) = controller();
        assert!(controller.add_point(Waypoint::new(0.0, 0.0)).is_err());
        assert!(controller.remove_point(0).is_err());
        assert!(controller.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_new_cluster_requires_a_commit_target() {
        let (mut controller, store, _selection) = controller();
        controller.enter_patrol_points_editing(None);
        for i in 0..3 {
            controller.add_point(Waypoint::new(i as f64, 0.0)).unwrap();
        }

        let err = controller.commit().await.unwrap_err();
        assert!(matches!(err, PatrolError::InvalidState(_)));

        controller.set_commit_target("c9".into());
        controller.commit().await.unwrap();
        assert_eq!(
            store.writes.lock().unwrap()[0].0,
            "clusters/c9/cluster_coordinates"
        );
    }
}
