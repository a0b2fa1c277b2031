//! Cluster call error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for cluster queries.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors from membership and upgrade-state queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from removing a node's membership record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemovalError {
    /// The record no longer exists.
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl From<ClusterError> for RemovalError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Transport(msg) => RemovalError::Transport(msg),
            ClusterError::Timeout(after) => RemovalError::Timeout(after),
        }
    }
}
