//! Node filter — finds the down nodes that are safe to remove.
//!
//! Pages through the full membership directory and keeps a node only if
//! all of the following hold:
//!
//! - its type is not the type this process runs on,
//! - its type is one of the managed types (case-insensitive),
//! - it is `Down`,
//! - it has been down strictly longer than the grace interval.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use sweep_cluster::{ClusterClient, ClusterError};
use sweep_core::{ManagedTypes, Node, NodeStatus, same_node_type};

use crate::call::bounded;
use crate::error::{CycleError, CycleResult};

/// Whether a single node may be removed at time `now` (epoch seconds).
pub fn is_eligible(
    node: &Node,
    self_type: &str,
    managed_types: &ManagedTypes,
    grace: Duration,
    now: u64,
) -> bool {
    // Never touch the node type this process is hosted on.
    if same_node_type(&node.node_type, self_type) {
        return false;
    }
    if node.status != NodeStatus::Down || !managed_types.contains(&node.node_type) {
        return false;
    }

    match node.down_for(now) {
        Some(down_for) => {
            debug!(node = %node.name, down_for_secs = down_for, "node is down");
            down_for > grace.as_secs()
        }
        None => {
            debug!(node = %node.name, "down node has no down timestamp");
            false
        }
    }
}

/// Paginated membership scan producing the set of removable nodes.
pub struct NodeFilter {
    client: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl NodeFilter {
    pub fn new(client: Arc<dyn ClusterClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Enumerate every membership page and return the eligible nodes,
    /// de-duplicated by name and ordered by name.
    pub async fn select_eligible(
        &self,
        self_type: &str,
        managed_types: &ManagedTypes,
        grace: Duration,
        now: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> CycleResult<Vec<Node>> {
        let mut eligible: BTreeMap<String, Node> = BTreeMap::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;
        let mut scanned = 0usize;

        loop {
            let page = bounded(
                shutdown,
                self.timeout,
                self.client
                    .query_membership_page(token.as_deref(), self.timeout),
                ClusterError::Timeout,
            )
            .await
            .ok_or(CycleError::Cancelled)?
            .map_err(CycleError::Membership)?;

            pages += 1;
            scanned += page.nodes.len();
            let next = page.next_token().map(str::to_string);

            for node in page.nodes {
                if is_eligible(&node, self_type, managed_types, grace, now) {
                    eligible.entry(node.name.clone()).or_insert(node);
                }
            }

            match next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(pages, scanned, eligible = eligible.len(), "membership scan complete");
        Ok(eligible.into_values().collect())
    }
}
