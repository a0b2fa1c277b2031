//! sweep-cluster — the cluster control-plane seam.
//!
//! The reconciler only ever issues three calls against the cluster:
//! a paginated membership query, an upgrade-state query, and the
//! removal of a node's membership record. [`ClusterClient`] captures
//! exactly those; [`HttpClusterClient`] implements them against a
//! JSON control-plane API.
//!
//! # Control-plane API
//!
//! ```text
//! GET    /api/v1/nodes[?continuation_token=T]  → MembershipPage
//! GET    /api/v1/cluster/upgrade               → {"state": UpgradeState}
//! DELETE /api/v1/nodes/{name}/state            → 2xx | 404 | 401/403
//! ```

pub mod client;
pub mod error;
pub mod rest;

pub use client::{ClusterClient, ClusterFuture};
pub use error::{ClusterError, ClusterResult, RemovalError};
pub use rest::HttpClusterClient;
