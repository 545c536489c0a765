// Error taxonomy shared across the engine
use thiserror::Error;

/// Failures the engine distinguishes. Sync failures degrade the affected
/// collection to an empty slot and never escalate; write failures propagate
/// only to their immediate caller.
#[derive(Debug, Error)]
pub enum PatrolError {
    #[error("sync failure on collection '{collection}': {message}")]
    Sync { collection: String, message: String },

    #[error("write to '{path}' failed: {message}")]
    Write { path: String, message: String },

    #[error("geometry utilities unavailable")]
    GeometryUnavailable,

    #[error("invalid state: {0}")]
    InvalidState(String),
}
