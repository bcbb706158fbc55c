// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves a plugin's entry point and instantiates its platform.
//!
//! Plugins are compiled in: the embedding application registers one
//! [`PlatformFactory`] per entry point name, and a manifest's `entry` field
//! selects which one builds the plugin.

use std::collections::HashMap;
use std::sync::Arc;

use plexbridge_core::{BridgeError, DeviceHost, Platform};
use tracing::{Span, debug, info};

use crate::manifest::read_manifest;
use crate::record::{PlatformHandle, PluginRecord};

/// Builds a plugin's platform.
///
/// `host` is the plugin's back-reference for registering devices and `span`
/// is its dedicated logging span.
pub trait PlatformFactory: Send + Sync {
    fn create(&self, host: Arc<dyn DeviceHost>, span: Span)
    -> Result<Box<dyn Platform>, BridgeError>;
}

impl<F> PlatformFactory for F
where
    F: Fn(Arc<dyn DeviceHost>, Span) -> Result<Box<dyn Platform>, BridgeError> + Send + Sync,
{
    fn create(
        &self,
        host: Arc<dyn DeviceHost>,
        span: Span,
    ) -> Result<Box<dyn Platform>, BridgeError> {
        self(host, span)
    }
}

/// Table of compiled-in factories keyed by entry point.
#[derive(Default)]
pub struct PluginLoader {
    factories: HashMap<String, Arc<dyn PlatformFactory>>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `entry`, replacing any previous one.
    pub fn register(
        &mut self,
        entry: impl Into<String>,
        factory: impl PlatformFactory + 'static,
    ) -> &mut Self {
        self.factories.insert(entry.into(), Arc::new(factory));
        self
    }

    pub fn has_entry(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }

    /// Load the platform of `record`.
    ///
    /// Re-reads the manifest (refreshing the record's metadata), resolves the
    /// entry point, runs the factory and checks the platform implements the
    /// declared capability. On any failure the record's load state is left
    /// untouched and [`BridgeError::Load`] is returned.
    pub fn load(
        &self,
        record: &mut PluginRecord,
        host: Arc<dyn DeviceHost>,
        span: Span,
    ) -> Result<PlatformHandle, BridgeError> {
        if record.is_loaded() {
            return Err(BridgeError::AlreadyLoaded {
                plugin: record.name.clone(),
            });
        }

        let load_error = |reason: String| BridgeError::Load {
            plugin: record.name.clone(),
            reason,
        };

        let (manifest, _) = read_manifest(&record.path).map_err(|e| load_error(e.to_string()))?;
        if manifest.name != record.name {
            return Err(load_error(format!(
                "manifest at {} now declares name `{}`",
                record.path.display(),
                manifest.name
            )));
        }

        let factory = self
            .factories
            .get(&manifest.entry)
            .ok_or_else(|| load_error(format!("entry point `{}` is not registered", manifest.entry)))?;

        let platform: Arc<dyn Platform> = Arc::from(
            factory
                .create(host, span)
                .map_err(|e| load_error(e.to_string()))?,
        );

        let handle = PlatformHandle::new(platform.clone(), manifest.capability).ok_or_else(|| {
            load_error(format!(
                "manifest declares {} but the platform implements {}",
                manifest.capability,
                platform.capability()
            ))
        })?;

        record.refresh(&manifest);
        record.set_platform(handle.clone());
        debug!(plugin = %record.name, entry = %manifest.entry, "factory resolved");
        info!(
            plugin = %record.name,
            version = %record.version,
            capability = %record.capability,
            "plugin loaded"
        );
        Ok(handle)
    }
}
