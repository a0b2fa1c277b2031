//! Cluster membership model.
//!
//! These types mirror what the membership directory reports. nodesweep
//! never creates or edits them; the only mutation it ever issues is the
//! removal of a whole node record.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Membership status of a node as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Up,
    Down,
    Removing,
    #[serde(other)]
    Unknown,
}

/// A single entry in the cluster membership directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node name within the cluster.
    pub name: String,
    /// Node type (category label, e.g. the scale set it belongs to).
    pub node_type: String,
    pub status: NodeStatus,
    /// Epoch seconds at which the node went down. Only meaningful
    /// when `status == Down`.
    #[serde(default)]
    pub down_since: Option<u64>,
}

impl Node {
    /// How long the node has been down as of `now` (epoch seconds).
    ///
    /// Returns `None` when the node is not down or the cluster did not
    /// report a down timestamp.
    pub fn down_for(&self, now: u64) -> Option<u64> {
        if self.status != NodeStatus::Down {
            return None;
        }
        self.down_since.map(|since| now.saturating_sub(since))
    }
}

/// One page of a membership enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPage {
    pub nodes: Vec<Node>,
    /// Cursor for the next page. `None` or empty means the enumeration
    /// is complete.
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl MembershipPage {
    /// The token to resume from, if there are more pages.
    pub fn next_token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Cluster-wide upgrade state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeState {
    Idle,
    RollingForwardPending,
    RollingForwardInProgress,
    RollingBackInProgress,
    #[serde(other)]
    Other,
}

impl UpgradeState {
    /// Whether a rolling upgrade or rollback is underway.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            UpgradeState::RollingForwardPending
                | UpgradeState::RollingForwardInProgress
                | UpgradeState::RollingBackInProgress
        )
    }
}

/// Identity of the node this process runs on.
pub trait SelfIdentity: Send + Sync {
    /// The node type hosting this process.
    fn current_node_type(&self) -> String;
}

/// A fixed node identity, resolved once at startup.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    node_type: String,
}

impl NodeIdentity {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
        }
    }
}

impl SelfIdentity for NodeIdentity {
    fn current_node_type(&self) -> String {
        self.node_type.clone()
    }
}

/// Current time in whole seconds since the Unix epoch.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
