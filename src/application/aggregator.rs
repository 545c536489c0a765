// Remote sync aggregator - merges the watched collections into one read model
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use crate::application::live_store::{LiveStore, Snapshot};
use crate::domain::geometry::{TracePoint, Waypoint};
use crate::domain::patrol::{
    CameraMarker, Cluster, Incident, Officer, OfficerKind, PatrolTask, RoutePath, Shift,
    TaskStatus, Timeliness,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Clusters,
    Tasks,
    Incidents,
    Cameras,
}

impl Slot {
    const ALL: [Slot; 4] = [Slot::Clusters, Slot::Tasks, Slot::Incidents, Slot::Cameras];

    fn path(&self) -> &'static str {
        match self {
            Self::Clusters => "clusters",
            Self::Tasks => "tasks",
            Self::Incidents => "incidents",
            Self::Cameras => "cameras",
        }
    }
}

/// The aggregate read model. Each watched collection owns exactly one slot;
/// `initialized` opens once every collection has reported at least once and
/// never closes again.
#[derive(Debug, Clone, Default)]
pub struct MapState {
    pub clusters: Vec<Cluster>,
    pub tasks: Vec<PatrolTask>,
    pub incidents: Vec<Incident>,
    pub cameras: Vec<CameraMarker>,
    pub initialized: bool,
}

#[derive(Default)]
struct Inner {
    state: MapState,
    reported: HashSet<Slot>,
}

/// Watches the four live collections and folds every full-replace delivery
/// into [MapState]. Owns its watcher tasks; [detach](Self::detach) tears them
/// down and is safe to call repeatedly.
pub struct RemoteSyncAggregator {
    store: Arc<dyn LiveStore>,
    inner: Arc<RwLock<Inner>>,
    detached: Arc<AtomicBool>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteSyncAggregator {
    pub fn new(store: Arc<dyn LiveStore>) -> Self {
        Self {
            store,
            inner: Arc::new(RwLock::new(Inner::default())),
            detached: Arc::new(AtomicBool::new(false)),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to all watched collections. Each collection gets its own
    /// watcher task; deliveries for one collection apply in order, deliveries
    /// across collections interleave freely.
    pub fn attach(&self) {
        let mut watchers = self.watchers.lock().unwrap();
        if !watchers.is_empty() || self.detached.load(Ordering::SeqCst) {
            return;
        }

        for slot in Slot::ALL {
            let mut stream = self.store.watch(slot.path());
            let inner = self.inner.clone();
            let detached = self.detached.clone();

            watchers.push(tokio::spawn(async move {
                while let Some(delivery) = stream.next().await {
                    // a late delivery after detach must not mutate state
                    if detached.load(Ordering::SeqCst) {
                        break;
                    }
                    let snapshot = match delivery {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::error!(
                                "delivery failed for '{}', degrading to empty slot: {}",
                                slot.path(),
                                e
                            );
                            Snapshot::new()
                        }
                    };
                    apply(&inner, slot, snapshot);
                }
            }));
        }
    }

    /// Unsubscribe all watchers. Idempotent.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
        for watcher in self.watchers.lock().unwrap().drain(..) {
            watcher.abort();
        }
    }

    /// A point-in-time clone of the read model.
    pub fn state(&self) -> MapState {
        self.inner.read().unwrap().state.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read().unwrap().state.initialized
    }
}

fn apply(inner: &RwLock<Inner>, slot: Slot, snapshot: Snapshot) {
    let mut inner = inner.write().unwrap();

    match slot {
        Slot::Clusters => inner.state.clusters = normalize_clusters(snapshot),
        Slot::Tasks => inner.state.tasks = normalize_tasks(snapshot),
        Slot::Incidents => inner.state.incidents = normalize_incidents(snapshot),
        Slot::Cameras => inner.state.cameras = normalize_cameras(snapshot),
    }

    inner.reported.insert(slot);
    // `reported` only grows, so the flag flips exactly once and never resets
    if !inner.state.initialized && inner.reported.len() == Slot::ALL.len() {
        inner.state.initialized = true;
        tracing::info!("all watched collections reported; read model is ready");
    }
}

// ---------------------------------------------------------------------------
// Wire records. The store's records are loosely typed and optional-heavy;
// they are validated here, at the boundary, before entering the state tree.
// Malformed records are skipped with a warning rather than failing the slot.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClusterRecord {
    name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    cluster_coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    officers: HashMap<String, OfficerRecord>,
}

#[derive(Debug, Deserialize)]
struct OfficerRecord {
    name: Option<String>,
    role: Option<String>,
    #[serde(rename = "type")]
    kind: Option<OfficerKind>,
    shift: Option<Shift>,
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(rename = "clusterId")]
    cluster_id: Option<String>,
    #[serde(rename = "clusterName")]
    cluster_name: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "officerName")]
    officer_name: Option<String>,
    #[serde(default)]
    assigned_route: Vec<[f64; 2]>,
    route_path: Option<RoutePath>,
    status: Option<TaskStatus>,
    timeliness: Option<Timeliness>,
    #[serde(rename = "startTime")]
    start_time: Option<DateTime<Utc>>,
    #[serde(rename = "endTime")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    mock_detections: HashMap<String, TracePoint>,
    distance: Option<f64>,
    #[serde(rename = "mockLocationCount")]
    mock_location_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct IncidentRecord {
    title: Option<String>,
    #[serde(rename = "clusterName")]
    cluster_name: Option<String>,
    #[serde(rename = "taskId")]
    task_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Comma-separated list of photo references.
    #[serde(rename = "photoUrl")]
    photo_url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CameraRecord {
    name: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
}

fn parse_record<T: serde::de::DeserializeOwned>(
    collection: &'static str,
    id: &str,
    value: serde_json::Value,
) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("skipping malformed {} record '{}': {}", collection, id, e);
            None
        }
    }
}

fn normalize_clusters(snapshot: Snapshot) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = snapshot
        .into_iter()
        .filter_map(|(id, value)| {
            let record: ClusterRecord = parse_record("cluster", &id, value)?;
            let Some(name) = record.name else {
                tracing::warn!("skipping cluster '{}' without a name", id);
                return None;
            };

            let mut officers: Vec<Officer> = record
                .officers
                .into_iter()
                .filter_map(|(officer_id, o)| {
                    // only field officers belong to the patrol read model
                    if o.role.as_deref() != Some("patrol") {
                        return None;
                    }
                    match (o.name, o.kind, o.shift) {
                        (Some(name), Some(kind), Some(shift)) => Some(Officer {
                            id: officer_id,
                            name,
                            kind,
                            shift,
                        }),
                        _ => {
                            tracing::warn!("skipping incomplete officer '{}'", officer_id);
                            None
                        }
                    }
                })
                .collect();
            officers.sort_by(|a, b| a.id.cmp(&b.id));

            Some(Cluster {
                id,
                name,
                email: record.email,
                cluster_coordinates: record
                    .cluster_coordinates
                    .into_iter()
                    .map(Waypoint::from)
                    .collect(),
                officers,
            })
        })
        .collect();

    clusters.sort_by(|a, b| a.id.cmp(&b.id));
    clusters
}

fn normalize_tasks(snapshot: Snapshot) -> Vec<PatrolTask> {
    let mut tasks: Vec<PatrolTask> = snapshot
        .into_iter()
        .filter_map(|(id, value)| {
            let record: TaskRecord = parse_record("task", &id, value)?;
            let (Some(cluster_id), Some(user_id), Some(status)) =
                (record.cluster_id, record.user_id, record.status)
            else {
                tracing::warn!("skipping task '{}' missing cluster, user or status", id);
                return None;
            };

            Some(PatrolTask {
                id,
                cluster_id,
                cluster_name: record.cluster_name,
                user_id,
                officer_name: record.officer_name,
                assigned_route: record.assigned_route.into_iter().map(Waypoint::from).collect(),
                route_path: record.route_path,
                status,
                timeliness: record.timeliness.unwrap_or_default(),
                start_time: record.start_time,
                end_time: record.end_time,
                mock_detections: record.mock_detections,
                distance_km: record.distance,
                mock_location_count: record.mock_location_count.unwrap_or(0),
            })
        })
        .collect();

    tasks.sort_by(|a, b| a.id.cmp(&b.id));
    tasks
}

fn normalize_incidents(snapshot: Snapshot) -> Vec<Incident> {
    let mut incidents: Vec<Incident> = snapshot
        .into_iter()
        .filter_map(|(id, value)| {
            let record: IncidentRecord = parse_record("incident", &id, value)?;
            let (Some(lat), Some(lng)) = (record.latitude, record.longitude) else {
                tracing::warn!("skipping incident '{}' without coordinates", id);
                return None;
            };

            let photo_urls = record
                .photo_url
                .map(|urls| {
                    urls.split(',')
                        .map(|u| u.trim().to_string())
                        .filter(|u| !u.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            Some(Incident {
                id,
                title: record.title,
                cluster_name: record.cluster_name,
                task_id: record.task_id,
                timestamp: record.timestamp,
                lat,
                lng,
                photo_urls,
                description: record.description,
            })
        })
        .collect();

    // newest first, matching how incidents are browsed
    incidents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
    incidents
}

fn normalize_cameras(snapshot: Snapshot) -> Vec<CameraMarker> {
    let mut cameras: Vec<CameraMarker> = snapshot
        .into_iter()
        .filter_map(|(id, value)| {
            let record: CameraRecord = parse_record("camera", &id, value)?;
            let (Some(lat), Some(lng)) = (record.lat, record.lng) else {
                tracing::warn!("skipping camera '{}' without coordinates", id);
                return None;
            };
            Some(CameraMarker {
                id,
                name: record.name,
                lat,
                lng,
            })
        })
        .collect();

    cameras.sort_by(|a, b| a.id.cmp(&b.id));
    cameras
}
