//! Upgrade guard — defers removals while a cluster upgrade is rolling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use sweep_cluster::{ClusterClient, ClusterError};

use crate::call::bounded;
use crate::error::{CycleError, CycleResult};

/// Decides whether cluster maintenance is in progress.
pub struct UpgradeGuard {
    client: Arc<dyn ClusterClient>,
    /// When false the guard never queries and always allows removal.
    enabled: bool,
    timeout: Duration,
}

impl UpgradeGuard {
    pub fn new(client: Arc<dyn ClusterClient>, enabled: bool, timeout: Duration) -> Self {
        Self {
            client,
            enabled,
            timeout,
        }
    }

    /// Whether a rolling upgrade or rollback is underway.
    ///
    /// Issues no query when the guard is disabled.
    pub async fn is_upgrade_in_progress(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> CycleResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        debug!("checking whether a cluster upgrade is in progress");
        let state = bounded(
            shutdown,
            self.timeout,
            self.client.query_upgrade_state(self.timeout),
            ClusterError::Timeout,
        )
        .await
        .ok_or(CycleError::Cancelled)?
        .map_err(CycleError::UpgradeState)?;

        debug!(?state, "cluster upgrade state");
        Ok(state.is_in_progress())
    }
}
