// Shared browse selection - which task/incident/cluster has focus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub task_id: Option<String>,
    pub incident_id: Option<String>,
    pub cluster_id: Option<String>,
}

impl Selection {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
