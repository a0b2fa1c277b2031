//! Settings and configuration providers.
//!
//! Settings are read exactly once, at startup, from a
//! [`ConfigurationProvider`]. Every value has a default: an absent,
//! negative, or unparseable value falls back silently instead of failing
//! construction.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// Section holding all nodesweep settings.
pub const SECTION: &str = "NodeManagerSettings";

pub const SCAN_INTERVAL_KEY: &str = "ScanIntervalInSeconds";
pub const OPERATION_TIMEOUT_KEY: &str = "ClientOperationTimeoutInSeconds";
pub const DOWN_GRACE_KEY: &str = "DownNodeGraceIntervalInSeconds";
pub const SKIP_DURING_UPGRADE_KEY: &str = "SkipNodesUnderFabricUpgrade";
pub const MANAGED_TYPES_KEY: &str = "NodeTypesToManage";

const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DOWN_GRACE_SECS: u64 = 120;
const DEFAULT_SKIP_DURING_UPGRADE: bool = true;

/// Source of raw setting strings, keyed by section and name.
pub trait ConfigurationProvider {
    fn get_setting(&self, section: &str, key: &str) -> Option<String>;
}

/// In-memory provider.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<(String, String), String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a value in a section.
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert((section.to_string(), key.to_string()), value.into());
        self
    }
}

impl ConfigurationProvider for MapConfig {
    fn get_setting(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }
}

/// Provider backed by a TOML document.
///
/// Top-level tables are sections. Scalar values of any TOML type are
/// handed out as strings so that typed parsing stays in one place.
///
/// ```toml
/// [NodeManagerSettings]
/// ScanIntervalInSeconds = 60
/// NodeTypesToManage = "worker, batch"
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlConfig {
    sections: HashMap<String, toml::Table>,
}

impl TomlConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a TOML document. Top-level keys that are not tables are
    /// skipped with a warning.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let document: toml::Table = toml::from_str(content)?;
        let mut sections = HashMap::new();
        for (name, value) in document {
            match value {
                toml::Value::Table(table) => {
                    sections.insert(name, table);
                }
                other => {
                    warn!(key = %name, kind = other.type_str(), "ignoring top-level setting outside any section");
                }
            }
        }
        Ok(Self { sections })
    }
}

impl ConfigurationProvider for TomlConfig {
    fn get_setting(&self, section: &str, key: &str) -> Option<String> {
        let value = self.sections.get(section)?.get(key)?;
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            other => {
                warn!(%section, %key, kind = other.type_str(), "ignoring non-scalar setting");
                None
            }
        }
    }
}

/// Case-folded form of a node type name, used for every type comparison.
pub fn fold_node_type(node_type: &str) -> String {
    node_type.to_lowercase()
}

/// Whether two node type names are the same, ignoring case.
pub fn same_node_type(a: &str, b: &str) -> bool {
    fold_node_type(a) == fold_node_type(b)
}

/// Node types this instance is allowed to act on.
///
/// Membership checks are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedTypes {
    /// Lowercased type names.
    types: BTreeSet<String>,
}

impl ManagedTypes {
    /// Parse a comma-separated list, trimming entries and dropping blanks.
    pub fn parse(list: &str) -> Self {
        let types = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(fold_node_type)
            .collect();
        Self { types }
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.types.contains(&fold_node_type(node_type))
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }
}

/// Immutable nodesweep settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Pause between reconciliation cycles.
    pub scan_interval: Duration,
    /// Upper bound for each cluster call.
    pub operation_timeout: Duration,
    /// How long a node must stay down before it may be removed.
    pub down_grace_interval: Duration,
    /// Defer removals while a cluster upgrade is rolling.
    pub skip_during_upgrade: bool,
    pub managed_types: ManagedTypes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            down_grace_interval: Duration::from_secs(DEFAULT_DOWN_GRACE_SECS),
            skip_during_upgrade: DEFAULT_SKIP_DURING_UPGRADE,
            managed_types: ManagedTypes::default(),
        }
    }
}

impl Settings {
    /// Read settings from the `NodeManagerSettings` section.
    pub fn load(provider: &dyn ConfigurationProvider) -> Self {
        let settings = Self {
            scan_interval: secs_setting(provider, SCAN_INTERVAL_KEY, DEFAULT_SCAN_INTERVAL_SECS),
            operation_timeout: secs_setting(
                provider,
                OPERATION_TIMEOUT_KEY,
                DEFAULT_OPERATION_TIMEOUT_SECS,
            ),
            down_grace_interval: secs_setting(provider, DOWN_GRACE_KEY, DEFAULT_DOWN_GRACE_SECS),
            skip_during_upgrade: bool_setting(
                provider,
                SKIP_DURING_UPGRADE_KEY,
                DEFAULT_SKIP_DURING_UPGRADE,
            ),
            managed_types: provider
                .get_setting(SECTION, MANAGED_TYPES_KEY)
                .map(|list| ManagedTypes::parse(&list))
                .unwrap_or_default(),
        };

        debug!(
            scan_interval_secs = settings.scan_interval.as_secs(),
            operation_timeout_secs = settings.operation_timeout.as_secs(),
            down_grace_secs = settings.down_grace_interval.as_secs(),
            skip_during_upgrade = settings.skip_during_upgrade,
            managed_types = settings.managed_types.len(),
            "settings loaded"
        );
        settings
    }
}

fn secs_setting(provider: &dyn ConfigurationProvider, key: &str, default: u64) -> Duration {
    let secs = provider
        .get_setting(SECTION, key)
        .and_then(|raw| parse_secs(&raw))
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn bool_setting(provider: &dyn ConfigurationProvider, key: &str, default: bool) -> bool {
    provider
        .get_setting(SECTION, key)
        .and_then(|raw| parse_bool(&raw))
        .unwrap_or(default)
}

/// Whole non-negative seconds. Negative values are rejected.
fn parse_secs(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
