// Live store contract - watched collections and replace-at-key writes
use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::PatrolError;

/// The complete key→record set for one watched path. An absent path is an
/// empty map, not an error.
pub type Snapshot = HashMap<String, serde_json::Value>;

/// A cancellable sequence of full-replace snapshot deliveries. Dropping the
/// stream unsubscribes.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot, PatrolError>> + Send>>;

#[async_trait]
pub trait LiveStore: Send + Sync {
    /// Watch a path. Every delivery is the complete current record set at
    /// that path, never a diff.
    fn watch(&self, path: &str) -> SnapshotStream;

    /// Replace the value at `path` wholesale.
    async fn replace(&self, path: &str, value: &serde_json::Value) -> Result<(), PatrolError>;
}
