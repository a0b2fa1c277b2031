//! Reconciler — the periodic driver.
//!
//! Runs one reconciliation cycle per `scan_interval` until shutdown.
//! Cycles never overlap: the next sleep only starts once every removal
//! of the current cycle has finished.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use sweep_cluster::ClusterClient;
use sweep_core::{SelfIdentity, Settings, epoch_secs};
use sweep_health::{HealthReporter, HealthSignal};

use crate::call::{is_shutdown, shutdown_signalled};
use crate::error::{CycleError, CycleResult};
use crate::filter::NodeFilter;
use crate::guard::UpgradeGuard;
use crate::remover::{NodeRemoval, NodeRemover};
use crate::{HEALTH_SOURCE, REPORT_TTL};

/// Where the reconciler is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Awake, about to start a cycle.
    Idle,
    /// Checking upgrade state and enumerating membership.
    Scanning,
    /// Removing eligible nodes.
    Removing,
    /// Waiting for the next tick.
    Sleeping,
    /// Shut down. Terminal.
    Stopped,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleSummary {
    /// No managed node types configured; nothing was attempted.
    Misconfigured,
    /// A cluster upgrade is rolling; removals deferred.
    DeferredForUpgrade,
    /// Scan completed and every eligible node was attempted.
    Completed { removals: Vec<NodeRemoval> },
}

/// Removes scaled-in nodes on a fixed interval.
pub struct Reconciler {
    settings: Settings,
    identity: Arc<dyn SelfIdentity>,
    reporter: Arc<dyn HealthReporter>,
    guard: UpgradeGuard,
    filter: NodeFilter,
    remover: NodeRemover,
    /// Wall clock in epoch seconds, replaceable for tests.
    clock: fn() -> u64,
    state: watch::Sender<LoopState>,
}

impl Reconciler {
    pub fn new(
        settings: Settings,
        client: Arc<dyn ClusterClient>,
        reporter: Arc<dyn HealthReporter>,
        identity: Arc<dyn SelfIdentity>,
    ) -> Self {
        let timeout = settings.operation_timeout;
        let (state, _) = watch::channel(LoopState::Idle);

        Self {
            guard: UpgradeGuard::new(client.clone(), settings.skip_during_upgrade, timeout),
            filter: NodeFilter::new(client.clone(), timeout),
            remover: NodeRemover::new(client, reporter.clone(), timeout),
            settings,
            identity,
            reporter,
            clock: epoch_secs,
            state,
        }
    }

    /// Set the clock used to measure how long nodes have been down.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Follow loop state changes.
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: LoopState) {
        self.state.send_replace(next);
    }

    /// Run the reconciler loop until shutdown is signalled.
    ///
    /// The first cycle starts immediately. Errors from a cycle are logged
    /// and never end the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.settings.scan_interval;
        info!(
            interval_secs = interval.as_secs(),
            managed_types = self.settings.managed_types.len(),
            "reconciler started"
        );

        loop {
            if is_shutdown(&shutdown) {
                break;
            }

            match self.tick(&mut shutdown).await {
                Ok(summary) => debug!(?summary, "reconciliation tick finished"),
                Err(CycleError::Cancelled) => break,
                Err(e) => error!(error = %e, "failed to remove scaled-in nodes"),
            }

            self.set_state(LoopState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown_signalled(&mut shutdown) => break,
            }
        }

        self.set_state(LoopState::Stopped);
        info!("reconciler shutting down");
    }

    /// One tick: validate settings, then run a cycle.
    pub async fn tick(&self, shutdown: &mut watch::Receiver<bool>) -> CycleResult<CycleSummary> {
        self.set_state(LoopState::Idle);

        if self.settings.managed_types.is_empty() {
            self.reporter.report(HealthSignal::warning(
                HEALTH_SOURCE,
                "NodeManagerSettings",
                self.settings.scan_interval,
                "Required parameter NodeTypesToManage is empty. Set it to the comma separated \
                 list of node type names to be managed.",
            ));
            return Ok(CycleSummary::Misconfigured);
        }

        self.run_cycle(shutdown).await
    }

    /// Guard check, membership scan, then removal of eligible nodes.
    pub async fn run_cycle(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> CycleResult<CycleSummary> {
        self.set_state(LoopState::Scanning);

        if self.guard.is_upgrade_in_progress(shutdown).await? {
            info!("skipping removal of scaled-in nodes, cluster upgrade in progress");
            self.reporter.report(HealthSignal::ok(
                HEALTH_SOURCE,
                "FabricUpgrade",
                REPORT_TTL,
                "Deferring removal of scaled-in nodes, cluster upgrade is in progress.",
            ));
            return Ok(CycleSummary::DeferredForUpgrade);
        }

        let self_type = self.identity.current_node_type();
        let eligible = self
            .filter
            .select_eligible(
                &self_type,
                &self.settings.managed_types,
                self.settings.down_grace_interval,
                (self.clock)(),
                shutdown,
            )
            .await?;

        info!(found = eligible.len(), "scan for scaled-in nodes complete");
        self.reporter.report(HealthSignal::ok(
            HEALTH_SOURCE,
            "Scan",
            REPORT_TTL,
            format!(
                "Completed scan to remove scaled-in nodes. Found {} nodes.",
                eligible.len()
            ),
        ));

        self.set_state(LoopState::Removing);
        let removals = self.remover.remove_all(&eligible, shutdown).await?;

        let failed = removals.iter().filter(|r| r.outcome.is_failure()).count();
        if !removals.is_empty() {
            info!(attempted = removals.len(), failed, "removal batch finished");
        }

        Ok(CycleSummary::Completed { removals })
    }
}
