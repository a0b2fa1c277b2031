//! sweep-core — shared types and settings for nodesweep.
//!
//! Holds the cluster membership model (`Node`, `NodeStatus`,
//! `UpgradeState`), the immutable `Settings` value, and the configuration
//! providers it is loaded from.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ConfigurationProvider, ManagedTypes, MapConfig, Settings, TomlConfig, fold_node_type,
    same_node_type,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
