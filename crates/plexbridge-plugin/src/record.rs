// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin records and loaded platform handles.

use std::path::PathBuf;
use std::sync::Arc;

use plexbridge_core::{CapabilityType, LifecycleStage, Platform, PluginState};
use serde::{Deserialize, Serialize};

use crate::manifest::PluginManifest;

/// A loaded platform, tagged with the capability it was validated against.
#[derive(Clone)]
pub enum PlatformHandle {
    SingleDevice(Arc<dyn Platform>),
    MultiDevice(Arc<dyn Platform>),
}

impl PlatformHandle {
    /// Wrap `platform` if it implements `declared`; `None` on a mismatch.
    pub fn new(platform: Arc<dyn Platform>, declared: CapabilityType) -> Option<Self> {
        if platform.capability() != declared {
            return None;
        }
        Some(match declared {
            CapabilityType::SingleDevice => PlatformHandle::SingleDevice(platform),
            CapabilityType::MultiDevice => PlatformHandle::MultiDevice(platform),
        })
    }

    pub fn capability(&self) -> CapabilityType {
        match self {
            PlatformHandle::SingleDevice(_) => CapabilityType::SingleDevice,
            PlatformHandle::MultiDevice(_) => CapabilityType::MultiDevice,
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        match self {
            PlatformHandle::SingleDevice(p) | PlatformHandle::MultiDevice(p) => p,
        }
    }
}

impl std::fmt::Debug for PlatformHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlatformHandle")
            .field(&self.capability())
            .field(&self.platform().name())
            .finish()
    }
}

/// Why a plugin dropped out of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFailure {
    pub stage: LifecycleStage,
    pub message: String,
}

/// One registered plugin.
///
/// Identity and enablement are persisted; everything else is runtime state
/// rebuilt on every start. The platform handle is present iff the plugin is
/// loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Declared name; unique within the registry.
    pub name: String,
    /// Directory the plugin was installed from.
    pub path: PathBuf,
    /// Semver version from the manifest.
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Declared capability; the platform must report the same on load.
    #[serde(rename = "type")]
    pub capability: CapabilityType,
    /// Only enabled plugins are loaded and started.
    pub enabled: bool,

    #[serde(skip)]
    platform: Option<PlatformHandle>,
    #[serde(skip)]
    state: PluginState,
    /// A controller has commissioned the plugin's endpoint.
    #[serde(skip)]
    pub paired: bool,
    #[serde(skip)]
    device_count: usize,
    #[serde(skip)]
    failure: Option<PluginFailure>,
}

impl PluginRecord {
    /// A fresh, enabled record for a plugin installed at `path`.
    pub fn from_manifest(manifest: PluginManifest, path: PathBuf) -> Self {
        Self {
            name: manifest.name,
            path,
            version: manifest.version,
            description: manifest.description,
            author: manifest.author,
            capability: manifest.capability,
            enabled: true,
            platform: None,
            state: PluginState::Registered,
            paired: false,
            device_count: 0,
            failure: None,
        }
    }

    /// Overwrite identity metadata from a freshly read manifest.
    pub fn refresh(&mut self, manifest: &PluginManifest) {
        self.version = manifest.version.clone();
        self.description = manifest.description.clone();
        self.author = manifest.author.clone();
        self.capability = manifest.capability;
    }

    pub fn platform(&self) -> Option<&PlatformHandle> {
        self.platform.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.platform.is_some()
    }

    pub(crate) fn set_platform(&mut self, handle: PlatformHandle) {
        self.platform = Some(handle);
        self.advance(PluginState::Loaded);
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    /// Move forward to `next`. Returns `false` (and changes nothing) when the
    /// record is already at or past `next`.
    pub fn advance(&mut self, next: PluginState) -> bool {
        if next <= self.state {
            return false;
        }
        self.state = next;
        true
    }

    pub fn is_started(&self) -> bool {
        self.state >= PluginState::Started
    }

    pub fn is_connected(&self) -> bool {
        self.state == PluginState::Connected
    }

    pub fn device_count(&self) -> usize {
        self.device_count
    }

    pub fn record_device(&mut self) {
        self.device_count += 1;
    }

    pub fn failure(&self) -> Option<&PluginFailure> {
        self.failure.as_ref()
    }

    /// Record the first failure; later failures keep the original stage.
    pub fn mark_failed(&mut self, stage: LifecycleStage, message: impl Into<String>) {
        if self.failure.is_none() {
            self.failure = Some(PluginFailure {
                stage,
                message: message.into(),
            });
        }
    }
}
