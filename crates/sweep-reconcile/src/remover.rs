//! Node remover — deletes membership records one node at a time.
//!
//! Failures are isolated per node: a failed removal is reported and the
//! batch moves on. Nothing is retried within a cycle; a node whose removal
//! failed is still down and will be picked up again by the next scan.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use sweep_cluster::{ClusterClient, RemovalError};
use sweep_core::Node;
use sweep_health::{HealthReporter, HealthSignal};

use crate::call::bounded;
use crate::error::{CycleError, CycleResult};
use crate::{HEALTH_SOURCE, REPORT_TTL};

/// Result of removing a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Succeeded,
    /// The record was already gone. Treated as converged, not as a failure.
    AlreadyRemoved,
    Failed(RemovalError),
}

impl RemovalOutcome {
    pub fn from_result(result: Result<(), RemovalError>) -> Self {
        match result {
            Ok(()) => RemovalOutcome::Succeeded,
            Err(RemovalError::NotFound(_)) => RemovalOutcome::AlreadyRemoved,
            Err(e) => RemovalOutcome::Failed(e),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RemovalOutcome::Failed(_))
    }
}

/// A node name paired with its removal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRemoval {
    pub node: String,
    pub outcome: RemovalOutcome,
}

impl NodeRemoval {
    /// The health signal describing this outcome.
    pub fn health_signal(&self) -> HealthSignal {
        match &self.outcome {
            RemovalOutcome::Succeeded => HealthSignal::ok(
                HEALTH_SOURCE,
                &self.node,
                REPORT_TTL,
                "Removed scaled-in node state successfully.",
            ),
            RemovalOutcome::AlreadyRemoved => HealthSignal::ok(
                HEALTH_SOURCE,
                &self.node,
                REPORT_TTL,
                "Scaled-in node state was already removed.",
            ),
            RemovalOutcome::Failed(e) => HealthSignal::warning(
                HEALTH_SOURCE,
                &self.node,
                REPORT_TTL,
                format!("Failed to remove scaled-in node state, Error = {e}"),
            ),
        }
    }
}

/// Removes nodes sequentially, reporting one health signal per node.
pub struct NodeRemover {
    client: Arc<dyn ClusterClient>,
    reporter: Arc<dyn HealthReporter>,
    timeout: Duration,
}

impl NodeRemover {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        reporter: Arc<dyn HealthReporter>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            reporter,
            timeout,
        }
    }

    /// Attempt removal of every node, in order.
    ///
    /// Only shutdown ends the batch early; outcomes already reported stand.
    pub async fn remove_all(
        &self,
        nodes: &[Node],
        shutdown: &mut watch::Receiver<bool>,
    ) -> CycleResult<Vec<NodeRemoval>> {
        let mut removals = Vec::with_capacity(nodes.len());

        for node in nodes {
            info!(node = %node.name, node_type = %node.node_type, "removing state of scaled-in node");

            let Some(result) = bounded(
                shutdown,
                self.timeout,
                self.client.remove_node_record(&node.name, self.timeout),
                RemovalError::Timeout,
            )
            .await
            else {
                info!(
                    attempted = removals.len(),
                    remaining = nodes.len() - removals.len(),
                    "node removal interrupted by shutdown"
                );
                return Err(CycleError::Cancelled);
            };

            let removal = NodeRemoval {
                node: node.name.clone(),
                outcome: RemovalOutcome::from_result(result),
            };

            match &removal.outcome {
                RemovalOutcome::Succeeded => info!(node = %removal.node, "removed node state"),
                RemovalOutcome::AlreadyRemoved => {
                    info!(node = %removal.node, "node state already removed")
                }
                RemovalOutcome::Failed(e) => {
                    warn!(node = %removal.node, error = %e, "failed to remove node state")
                }
            }

            self.reporter.report(removal.health_signal());
            removals.push(removal);
        }

        Ok(removals)
    }
}
