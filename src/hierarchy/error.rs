//! Error types for hierarchy computation.

use thiserror::Error;

use crate::model::ModelError;

/// Failure of [`ensure_refreshed`](super::HierarchyLifecycle::ensure_refreshed)
/// or [`force_full_rebuild`](super::HierarchyLifecycle::force_full_rebuild).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The computation observed its cancellation token. The lifecycle keeps
    /// whatever snapshot it had before the call.
    #[error("Hierarchy computation cancelled")]
    Cancelled,

    /// The symbol database failed. The lifecycle has been cleared.
    #[error("Hierarchy computation failed: {0}")]
    Compute(#[source] ModelError),
}

impl From<ModelError> for HierarchyError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Cancelled => Self::Cancelled,
            other => Self::Compute(other),
        }
    }
}

/// Result alias for lifecycle operations.
pub type HierarchyResult<T> = Result<T, HierarchyError>;
