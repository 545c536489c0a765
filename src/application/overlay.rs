// Overlay lifecycle - single owner of the rendered route line
use crate::domain::compliance::path_polyline;
use crate::domain::geometry::Waypoint;
use crate::domain::patrol::PatrolTask;

/// Rendering surface seam. The real implementation lives in the map UI layer;
/// the engine only ever sets or clears one named route-line resource.
/// `center_on` and `set_zoom` exist for that layer's own use.
pub trait RenderSurface: Send {
    fn set_route_line(&mut self, points: &[Waypoint]);
    fn clear_route_line(&mut self);
    fn center_on(&mut self, point: Waypoint);
    fn set_zoom(&mut self, level: u8);
}

/// Owns at most one active route-line resource. The resource is always
/// destroyed and recreated, never mutated in place. All operations are
/// no-ops until a surface is attached.
#[derive(Default)]
pub struct OverlayLifecycleManager {
    surface: Option<Box<dyn RenderSurface>>,
    active: bool,
    /// Task id and route-path length of the last rendered selection. Tasks
    /// are compared by id because every aggregator snapshot produces fresh
    /// objects.
    tracked: Option<(String, usize)>,
}

impl OverlayLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_surface(&mut self, surface: Box<dyn RenderSurface>) {
        self.surface = Some(surface);
    }

    pub fn has_active_route(&self) -> bool {
        self.active
    }

    /// Replace the active route line: destroy the existing resource first,
    /// then create the new one.
    pub fn set_active_route(&mut self, points: &[Waypoint]) {
        self.clear_active_route();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if points.is_empty() {
            return;
        }
        surface.set_route_line(points);
        self.active = true;
    }

    /// Destroy the active route line if present, otherwise do nothing.
    pub fn clear_active_route(&mut self) {
        if !self.active {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.clear_route_line();
        }
        self.active = false;
        self.tracked = None;
    }

    /// Re-render for the currently selected task. Called on every selection
    /// change and on every aggregator snapshot; only a change of task id or
    /// of its recorded path length triggers a redraw.
    pub fn sync_selected_task(&mut self, task: Option<&PatrolTask>) {
        let Some(task) = task else {
            self.clear_active_route();
            return;
        };

        if self.surface.is_none() {
            return;
        }

        let fingerprint = (
            task.id.clone(),
            task.route_path.as_ref().map_or(0, |p| p.len()),
        );
        if self.tracked.as_ref() == Some(&fingerprint) {
            return;
        }

        match &task.route_path {
            Some(path) if !path.is_empty() => {
                let points = path_polyline(path);
                self.set_active_route(&points);
            }
            _ => self.clear_active_route(),
        }
        self.tracked = Some(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::TracePoint;
    use crate::domain::patrol::{RoutePath, TaskStatus, Timeliness};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum SurfaceCall {
        Set(usize),
        Clear,
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        calls: Arc<Mutex<Vec<SurfaceCall>>>,
    }

    impl RenderSurface for RecordingSurface {
        fn set_route_line(&mut self, points: &[Waypoint]) {
            self.calls.lock().unwrap().push(SurfaceCall::Set(points.len()));
        }
        fn clear_route_line(&mut self) {
            self.calls.lock().unwrap().push(SurfaceCall::Clear);
        }
        fn center_on(&mut self, _point: Waypoint) {}
        fn set_zoom(&mut self, _level: u8) {}
    }

    fn task_with_path(id: &str, trace_count: usize) -> PatrolTask {
        let mut path = RoutePath::new();
        for i in 0..trace_count {
            path.insert(
                format!("p{}", i),
                TracePoint {
                    coordinates: [i as f64 * 0.0001, 0.0],
                    timestamp: i as i64,
                },
            );
        }
        PatrolTask {
            id: id.to_string(),
            cluster_id: "c1".into(),
            cluster_name: None,
            user_id: "u1".into(),
            officer_name: None,
            assigned_route: Vec::new(),
            route_path: (trace_count > 0).then_some(path),
            status: TaskStatus::Ongoing,
            timeliness: Timeliness::Unknown,
            start_time: None,
            end_time: None,
            mock_detections: HashMap::new(),
            distance_km: None,
            mock_location_count: 0,
        }
    }

    #[test]
    fn test_safe_before_surface_attached() {
        let mut manager = OverlayLifecycleManager::new();
        manager.set_active_route(&[Waypoint::new(0.0, 0.0)]);
        manager.clear_active_route();
        manager.sync_selected_task(Some(&task_with_path("t1", 2)));
        assert!(!manager.has_active_route());
    }

    #[test]
    fn test_replace_destroys_before_creating() {
        let surface = RecordingSurface::default();
        let calls = surface.calls.clone();

        let mut manager = OverlayLifecycleManager::new();
        manager.attach_surface(Box::new(surface));

        manager.set_active_route(&[Waypoint::new(0.0, 0.0), Waypoint::new(1.0, 1.0)]);
        manager.set_active_route(&[Waypoint::new(2.0, 2.0)]);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![SurfaceCall::Set(2), SurfaceCall::Clear, SurfaceCall::Set(1)]
        );
    }

    #[test]
    fn test_clear_without_active_route_is_a_noop() {
        let surface = RecordingSurface::default();
        let calls = surface.calls.clone();

        let mut manager = OverlayLifecycleManager::new();
        manager.attach_surface(Box::new(surface));
        manager.clear_active_route();

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sync_redraws_only_on_id_or_path_change() {
        let surface = RecordingSurface::default();
        let calls = surface.calls.clone();

        let mut manager = OverlayLifecycleManager::new();
        manager.attach_surface(Box::new(surface));

        // fresh object, same id and path length: no redraw
        manager.sync_selected_task(Some(&task_with_path("t1", 2)));
        manager.sync_selected_task(Some(&task_with_path("t1", 2)));
        assert_eq!(calls.lock().unwrap().len(), 1);

        // the path grew: redraw (destroy + create)
        manager.sync_selected_task(Some(&task_with_path("t1", 3)));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![SurfaceCall::Set(2), SurfaceCall::Clear, SurfaceCall::Set(3)]
        );

        // another task selected: redraw again
        manager.sync_selected_task(Some(&task_with_path("t2", 1)));
        assert!(manager.has_active_route());

        // deselect: resource destroyed
        manager.sync_selected_task(None);
        assert!(!manager.has_active_route());
    }

    #[test]
    fn test_task_without_path_clears_overlay() {
        let surface = RecordingSurface::default();

        let mut manager = OverlayLifecycleManager::new();
        manager.attach_surface(Box::new(surface));

        manager.sync_selected_task(Some(&task_with_path("t1", 2)));
        assert!(manager.has_active_route());

        manager.sync_selected_task(Some(&task_with_path("t2", 0)));
        assert!(!manager.has_active_route());
    }
}
