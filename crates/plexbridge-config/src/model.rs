// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that a misspelled key
//! is reported at startup instead of being silently ignored.

use std::time::Duration;

use plexbridge_core::Topology;
use serde::{Deserialize, Serialize};

/// Top-level plexbridge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlexbridgeConfig {
    /// Topology and logging.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Startup and shutdown timing.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Identity defaults for bridge-owned endpoints and aggregators.
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Bridge topology and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// `bridge` (one shared aggregator) or `childbridge` (one endpoint per plugin).
    #[serde(default)]
    pub mode: Topology,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: Topology::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the registry and endpoint identities.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Copy the database to `<stem>.backup.db` before opening it.
    #[serde(default = "default_true")]
    pub backup_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            backup_on_start: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("plexbridge").join("plexbridge.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("plexbridge.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Startup and shutdown timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// How long every enabled plugin has to reach `started`.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,

    /// Grace period for plugin shutdown before the engine is torn down.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Delay between a controller connecting and deferred devices being attached.
    #[serde(default = "default_connect_settle_ms")]
    pub connect_settle_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: default_start_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            connect_settle_ms: default_connect_settle_ms(),
        }
    }
}

impl LifecycleConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }
}

fn default_start_timeout_secs() -> u64 {
    120
}

fn default_shutdown_grace_secs() -> u64 {
    2
}

fn default_connect_settle_ms() -> u64 {
    2000
}

/// Identity defaults for endpoints the bridge owns.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    /// Product name of the shared aggregator.
    #[serde(default = "default_product_name")]
    pub product_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            vendor_name: default_vendor_name(),
            product_id: default_product_id(),
            product_name: default_product_name(),
        }
    }
}

fn default_vendor_id() -> u16 {
    0xfff1
}

fn default_vendor_name() -> String {
    "Plexbridge".to_string()
}

fn default_product_id() -> u16 {
    0x8000
}

fn default_product_name() -> String {
    "Plexbridge aggregator".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PlexbridgeConfig::default();
        assert_eq!(config.bridge.mode, Topology::SingleAggregator);
        assert_eq!(config.bridge.log_level, "info");
        assert!(config.storage.database_path.ends_with("plexbridge.db"));
        assert!(config.storage.backup_on_start);
        assert_eq!(config.lifecycle.start_timeout(), Duration::from_secs(120));
        assert_eq!(config.lifecycle.shutdown_grace(), Duration::from_secs(2));
        assert_eq!(config.lifecycle.connect_settle(), Duration::from_millis(2000));
        assert_eq!(config.identity.vendor_id, 0xfff1);
    }

    #[test]
    fn childbridge_mode_parses() {
        let config: PlexbridgeConfig = toml::from_str("[bridge]\nmode = \"childbridge\"\n").unwrap();
        assert_eq!(config.bridge.mode, Topology::PerPlugin);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<PlexbridgeConfig, _> = toml::from_str("[lifecycle]\nstart_timeout = 5\n");
        assert!(result.is_err());
    }
}
