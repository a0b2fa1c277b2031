//! The cluster client trait.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sweep_core::{MembershipPage, UpgradeState};

use crate::error::{ClusterResult, RemovalError};

/// Boxed future alias for cluster calls.
pub type ClusterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Calls the reconciler issues against the cluster control plane.
///
/// Every call takes the caller's operation timeout. Implementations should
/// honour it; the reconciler also enforces it from the outside.
pub trait ClusterClient: Send + Sync {
    /// Fetch one page of membership. Pass `None` for the first page and
    /// the previous page's continuation token afterwards.
    fn query_membership_page<'a>(
        &'a self,
        token: Option<&'a str>,
        timeout: Duration,
    ) -> ClusterFuture<'a, ClusterResult<MembershipPage>>;

    /// Current cluster upgrade state.
    fn query_upgrade_state(&self, timeout: Duration) -> ClusterFuture<'_, ClusterResult<UpgradeState>>;

    /// Delete the membership record of a node.
    fn remove_node_record<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> ClusterFuture<'a, Result<(), RemovalError>>;
}
