//! sweep-reconcile — periodic removal of scaled-in cluster nodes.
//!
//! When an autoscaler removes a machine, the cluster keeps its membership
//! record around as a `Down` node. The reconciler finds those records and
//! deletes them once they have been down longer than the grace interval.
//!
//! # Cycle
//!
//! ```text
//! Reconciler::run (every scan_interval, until shutdown)
//!   ├── managed types empty? → Warning, skip
//!   ├── UpgradeGuard   → rolling upgrade? → Ok "deferring", skip
//!   ├── NodeFilter     → page through membership, keep eligible Down nodes
//!   ├── Scan report    → Ok "Found N nodes"
//!   └── NodeRemover    → remove each node, one health report per node
//! ```
//!
//! Every cluster call is bounded by the operation timeout and aborted as
//! soon as shutdown is signalled. A failed cycle is logged and retried
//! from scratch on the next tick.

use std::time::Duration;

mod call;
pub mod error;
pub mod filter;
pub mod guard;
pub mod reconciler;
pub mod remover;

pub use error::{CycleError, CycleResult};
pub use filter::{NodeFilter, is_eligible};
pub use guard::UpgradeGuard;
pub use reconciler::{CycleSummary, LoopState, Reconciler};
pub use remover::{NodeRemoval, NodeRemover, RemovalOutcome};

/// Source name attached to every health signal.
pub const HEALTH_SOURCE: &str = "NodeManager";

/// Lifetime of scan, upgrade, and per-node health signals.
pub const REPORT_TTL: Duration = Duration::from_secs(300);
