//! Reconciliation cycle errors.

use thiserror::Error;

use sweep_cluster::ClusterError;

pub type CycleResult<T> = Result<T, CycleError>;

/// Why a reconciliation cycle ended early.
///
/// Per-node removal failures never show up here; they are reported as
/// outcomes instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("upgrade state query failed: {0}")]
    UpgradeState(ClusterError),

    #[error("membership query failed: {0}")]
    Membership(ClusterError),

    /// Shutdown was signalled. Not a failure.
    #[error("cycle cancelled by shutdown")]
    Cancelled,
}

impl CycleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CycleError::Cancelled)
    }
}
