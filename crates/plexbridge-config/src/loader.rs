// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./plexbridge.toml` > `~/.config/plexbridge/plexbridge.toml`
//! > `/etc/plexbridge/plexbridge.toml`, with `PLEXBRIDGE_` environment
//! variables overriding all files.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PlexbridgeConfig;

const SYSTEM_CONFIG: &str = "/etc/plexbridge/plexbridge.toml";
const LOCAL_CONFIG: &str = "plexbridge.toml";

/// Path of the per-user config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plexbridge").join(LOCAL_CONFIG))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<PlexbridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PlexbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlexbridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PlexbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlexbridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PlexbridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider mapping `PLEXBRIDGE_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: keys such as
/// `start_timeout_secs` contain underscores themselves. Figment hands the
/// mapper the variable name in its original case.
fn env_provider() -> Env {
    Env::prefixed("PLEXBRIDGE_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        let mapped = SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or(key);
        mapped.into()
    })
}

const SECTIONS: [&str; 4] = ["bridge", "storage", "lifecycle", "identity"];

#[cfg(test)]
mod tests {
    use super::*;
    use plexbridge_core::Topology;

    #[test]
    fn string_overrides_defaults() {
        let config = load_config_from_str(
            "[bridge]\nmode = \"per-plugin\"\n[lifecycle]\nstart_timeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.bridge.mode, Topology::PerPlugin);
        assert_eq!(config.lifecycle.start_timeout_secs, 30);
        assert_eq!(config.lifecycle.shutdown_grace_secs, 2);
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                "[storage]\ndatabase_path = \"/tmp/from-file.db\"\n",
            )?;
            jail.set_env("PLEXBRIDGE_LIFECYCLE_CONNECT_SETTLE_MS", "0");
            jail.set_env("PLEXBRIDGE_BRIDGE_MODE", "childbridge");

            let config = load_config_from_path(Path::new("custom.toml")).unwrap();
            assert_eq!(config.storage.database_path, "/tmp/from-file.db");
            assert_eq!(config.lifecycle.connect_settle_ms, 0);
            assert_eq!(config.bridge.mode, Topology::PerPlugin);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_apply_to_the_standard_hierarchy() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG, "[lifecycle]\nshutdown_grace_secs = 5\n")?;
            jail.set_env("PLEXBRIDGE_LIFECYCLE_START_TIMEOUT_SECS", "7");
            jail.set_env("PLEXBRIDGE_IDENTITY_VENDOR_NAME", "Acme");
            jail.set_env("PLEXBRIDGE_STORAGE_BACKUP_ON_START", "false");

            let config: PlexbridgeConfig = build_figment().extract()?;
            assert_eq!(config.lifecycle.start_timeout_secs, 7);
            assert_eq!(config.lifecycle.shutdown_grace_secs, 5);
            assert_eq!(config.identity.vendor_name, "Acme");
            assert!(!config.storage.backup_on_start);
            Ok(())
        });
    }

    #[test]
    fn unknown_env_section_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PLEXBRIDGE_NETWORK_PORT", "5540");
            assert!(build_figment().extract::<PlexbridgeConfig>().is_err());
            Ok(())
        });
    }
}
