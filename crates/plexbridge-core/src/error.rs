// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the plexbridge device bridge.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all plexbridge crates.
///
/// Per-plugin variants carry the plugin name so that failures can be
/// reported with the identity of the plugin that caused them.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The plugin entry point could not be resolved or its factory failed.
    #[error("failed to load plugin {plugin}: {reason}")]
    Load { plugin: String, reason: String },

    /// A second load was requested for a plugin that already has a platform.
    #[error("plugin {plugin} is already loaded")]
    AlreadyLoaded { plugin: String },

    /// A plugin with the same declared name is already registered.
    #[error("plugin {plugin} is already registered")]
    Duplicate { plugin: String },

    /// No plugin with the given name is registered.
    #[error("plugin {plugin} is not registered")]
    NotFound { plugin: String },

    /// The same device was registered twice for a plugin.
    #[error("device {device} is already registered for plugin {plugin}")]
    DuplicateDevice { plugin: String, device: String },

    /// A device was registered before its plugin finished loading.
    #[error("plugin {plugin} is not loaded")]
    NotLoaded { plugin: String },

    /// A device is missing data its registration path requires.
    #[error("device {device} of plugin {plugin} rejected: {reason}")]
    InvalidDevice {
        plugin: String,
        device: String,
        reason: String,
    },

    /// A hosting endpoint could not be constructed.
    #[error("cannot create endpoint for {plugin}: {reason}")]
    EndpointCreation { plugin: String, reason: String },

    /// A platform's `on_start` resolved with an error.
    #[error("plugin {plugin} failed to start: {reason}")]
    PluginStart { plugin: String, reason: String },

    /// The start barrier did not release before the timeout elapsed.
    #[error("plugins {pending:?} did not start within {timeout:?}")]
    StartupTimeout {
        pending: Vec<String>,
        timeout: Duration,
    },

    /// The protocol engine failed. Fatal to the process.
    #[error("protocol engine error: {0}")]
    ProtocolEngine(String),

    /// Configuration errors (invalid TOML, missing fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A plugin manifest could not be read or parsed.
    #[error("invalid plugin manifest: {0}")]
    Manifest(String),

    /// Storage backend errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Returns the plugin this error is attributed to, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            BridgeError::Load { plugin, .. }
            | BridgeError::AlreadyLoaded { plugin }
            | BridgeError::Duplicate { plugin }
            | BridgeError::NotFound { plugin }
            | BridgeError::DuplicateDevice { plugin, .. }
            | BridgeError::NotLoaded { plugin }
            | BridgeError::InvalidDevice { plugin, .. }
            | BridgeError::EndpointCreation { plugin, .. }
            | BridgeError::PluginStart { plugin, .. } => Some(plugin),
            _ => None,
        }
    }

    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ProtocolEngine(_) | BridgeError::StartupTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_attribution() {
        let err = BridgeError::DuplicateDevice {
            plugin: "hue".into(),
            device: "lamp-1".into(),
        };
        assert_eq!(err.plugin(), Some("hue"));
        assert_eq!(BridgeError::ProtocolEngine("boom".into()).plugin(), None);
    }

    #[test]
    fn fatal_classification() {
        assert!(BridgeError::ProtocolEngine("down".into()).is_fatal());
        assert!(
            BridgeError::StartupTimeout {
                pending: vec!["slow".into()],
                timeout: Duration::from_secs(1),
            }
            .is_fatal()
        );
        assert!(!BridgeError::NotFound { plugin: "x".into() }.is_fatal());
    }

    #[test]
    fn messages_name_the_plugin() {
        let err = BridgeError::EndpointCreation {
            plugin: "shelly".into(),
            reason: "no basic information".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot create endpoint for shelly: no basic information"
        );
    }
}
