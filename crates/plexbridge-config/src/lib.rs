// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the plexbridge device bridge.
//!
//! TOML parsing with strict validation (`deny_unknown_fields`), a system/user/local
//! file hierarchy, `PLEXBRIDGE_` environment overrides, and miette diagnostics
//! with typo suggestions.
//!
//! ```no_run
//! use plexbridge_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("topology: {}", config.bridge.mode);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{BridgeConfig, IdentityConfig, LifecycleConfig, PlexbridgeConfig, StorageConfig};

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<PlexbridgeConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from one explicit file and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<PlexbridgeConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<PlexbridgeConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("plexbridge.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("plexbridge.toml").display().to_string())
            .unwrap_or_else(|_| "plexbridge.toml".to_string());
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = Path::new("/etc/plexbridge/plexbridge.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_string_loads() {
        let config = load_and_validate_str("[bridge]\nmode = \"childbridge\"\n").unwrap();
        assert_eq!(config.bridge.mode, plexbridge_core::Topology::PerPlugin);
    }

    #[test]
    fn typo_produces_suggestion() {
        let errors = load_and_validate_str("[lifecycle]\nstart_timout_secs = 5\n").unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => {
                assert_eq!(key, "start_timout_secs");
                assert_eq!(suggestion.as_deref(), Some("start_timeout_secs"));
            }
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let errors = load_and_validate_str("[lifecycle]\nstart_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::Validation { .. }));
    }
}
