//! Scripted cluster client shared by the reconciler integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sweep_cluster::{ClusterClient, ClusterError, ClusterFuture, ClusterResult, RemovalError};
use sweep_core::{MembershipPage, Node, NodeStatus, UpgradeState};

/// Fixed "now" used by reconcilers under test.
pub const NOW: u64 = 1_000_000;

pub fn fixed_clock() -> u64 {
    NOW
}

/// A recorded cluster call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Membership(Option<String>),
    Upgrade,
    Remove(String),
}

/// In-memory cluster with scripted pages, upgrade state, and failures.
pub struct FakeCluster {
    /// Pages keyed by the token that requests them (`None` = first page).
    pages: Mutex<HashMap<Option<String>, MembershipPage>>,
    upgrade: Mutex<Result<UpgradeState, ClusterError>>,
    removal_errors: Mutex<HashMap<String, RemovalError>>,
    membership_error: Mutex<Option<ClusterError>>,
    hang_membership: AtomicBool,
    hang_upgrade: AtomicBool,
    hang_removal: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl FakeCluster {
    /// A cluster whose membership is split into the given pages.
    pub fn with_pages(pages: Vec<Vec<Node>>) -> Self {
        let mut scripted = HashMap::new();
        let count = pages.len().max(1);
        let mut pages = pages.into_iter();

        for i in 0..count {
            let request_token = if i == 0 { None } else { Some(format!("page-{i}")) };
            let continuation_token = if i + 1 < count {
                Some(format!("page-{}", i + 1))
            } else {
                None
            };
            scripted.insert(
                request_token,
                MembershipPage {
                    nodes: pages.next().unwrap_or_default(),
                    continuation_token,
                },
            );
        }

        Self {
            pages: Mutex::new(scripted),
            upgrade: Mutex::new(Ok(UpgradeState::Idle)),
            removal_errors: Mutex::new(HashMap::new()),
            membership_error: Mutex::new(None),
            hang_membership: AtomicBool::new(false),
            hang_upgrade: AtomicBool::new(false),
            hang_removal: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self::with_pages(vec![nodes])
    }

    pub fn set_upgrade(&self, state: Result<UpgradeState, ClusterError>) {
        *self.upgrade.lock().unwrap() = state;
    }

    pub fn fail_membership(&self, err: ClusterError) {
        *self.membership_error.lock().unwrap() = Some(err);
    }

    pub fn fail_removal(&self, name: &str, err: RemovalError) {
        self.removal_errors
            .lock()
            .unwrap()
            .insert(name.to_string(), err);
    }

    pub fn hang_membership(&self) {
        self.hang_membership.store(true, Ordering::SeqCst);
    }

    pub fn hang_upgrade(&self) {
        self.hang_upgrade.store(true, Ordering::SeqCst);
    }

    pub fn hang_removal(&self) {
        self.hang_removal.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn removal_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Remove(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn upgrade_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Upgrade).count()
    }

    pub fn membership_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Membership(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ClusterClient for FakeCluster {
    fn query_membership_page<'a>(
        &'a self,
        token: Option<&'a str>,
        _timeout: Duration,
    ) -> ClusterFuture<'a, ClusterResult<MembershipPage>> {
        Box::pin(async move {
            self.record(Call::Membership(token.map(str::to_string)));
            if self.hang_membership.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.membership_error.lock().unwrap().clone() {
                return Err(err);
            }
            self.pages
                .lock()
                .unwrap()
                .get(&token.map(str::to_string))
                .cloned()
                .ok_or_else(|| ClusterError::Transport(format!("unknown token {token:?}")))
        })
    }

    fn query_upgrade_state(
        &self,
        _timeout: Duration,
    ) -> ClusterFuture<'_, ClusterResult<UpgradeState>> {
        Box::pin(async move {
            self.record(Call::Upgrade);
            if self.hang_upgrade.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.upgrade.lock().unwrap().clone()
        })
    }

    fn remove_node_record<'a>(
        &'a self,
        name: &'a str,
        _timeout: Duration,
    ) -> ClusterFuture<'a, Result<(), RemovalError>> {
        Box::pin(async move {
            self.record(Call::Remove(name.to_string()));
            if self.hang_removal.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            match self.removal_errors.lock().unwrap().get(name) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        })
    }
}

/// A down node that went down `secs_ago` seconds before [`NOW`].
pub fn down(name: &str, node_type: &str, secs_ago: u64) -> Node {
    Node {
        name: name.to_string(),
        node_type: node_type.to_string(),
        status: NodeStatus::Down,
        down_since: Some(NOW - secs_ago),
    }
}

pub fn up(name: &str, node_type: &str) -> Node {
    Node {
        name: name.to_string(),
        node_type: node_type.to_string(),
        status: NodeStatus::Up,
        down_since: None,
    }
}
