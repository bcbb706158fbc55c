// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::PlexbridgeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &PlexbridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.bridge.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bridge.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.bridge.log_level
            ),
        });
    }

    if config.lifecycle.start_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "lifecycle.start_timeout_secs must be greater than zero".to_string(),
        });
    }

    for (key, value) in [
        ("identity.vendor_name", &config.identity.vendor_name),
        ("identity.product_name", &config.identity.product_name),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        } else if value.chars().count() > plexbridge_core::types::MAX_LABEL_LEN {
            errors.push(ConfigError::Validation {
                message: format!(
                    "{key} must be at most {} characters, got {}",
                    plexbridge_core::types::MAX_LABEL_LEN,
                    value.chars().count()
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
