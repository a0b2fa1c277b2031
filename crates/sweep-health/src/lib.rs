//! sweep-health — health signals for nodesweep.
//!
//! The reconciler never talks to a health transport directly. It hands
//! [`HealthSignal`]s to a [`HealthReporter`], which must accept them
//! without blocking or failing.
//!
//! # Architecture
//!
//! ```text
//! Reconciler
//!   └── Arc<dyn HealthReporter>
//!         └── HealthBoard
//!               ├── latest signal per (source, instance_key)
//!               ├── expires entries after their TTL
//!               └── echoes every signal as a tracing event
//! ```

pub mod board;
pub mod signal;

pub use board::HealthBoard;
pub use signal::{HealthReporter, HealthSignal, Severity};
