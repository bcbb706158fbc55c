// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered, persisted registry of installed plugins.
//!
//! The full record set is written to the `plugins` key of the `bridge`
//! namespace after every mutation. A mutation whose write fails is rolled
//! back so memory and storage never disagree.

use std::path::Path;

use plexbridge_core::{BridgeError, StorageContext};
use tracing::{debug, info};

use crate::manifest::read_manifest;
use crate::record::PluginRecord;

/// Storage key of the persisted record list.
pub const REGISTRY_KEY: &str = "plugins";

/// Registry of plugins in installation order.
pub struct PluginRegistry {
    records: Vec<PluginRecord>,
    storage: StorageContext,
}

impl PluginRegistry {
    /// Restore the registry persisted in `storage` (empty on first run).
    pub async fn open(storage: StorageContext) -> Result<Self, BridgeError> {
        let records: Vec<PluginRecord> = storage.get_or(REGISTRY_KEY, Vec::new()).await?;
        debug!(count = records.len(), "plugin registry restored");
        Ok(Self { records, storage })
    }

    /// All records in registry order.
    pub fn list(&self) -> &[PluginRecord] {
        &self.records
    }

    /// Records that participate in the lifecycle.
    pub fn enabled(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter().filter(|r| r.enabled)
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut PluginRecord> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    /// Look a record up by name, or by the path it was installed from.
    pub fn resolve(&self, name_or_path: &str) -> Option<&PluginRecord> {
        self.position(name_or_path).map(|i| &self.records[i])
    }

    fn position(&self, name_or_path: &str) -> Option<usize> {
        if let Some(i) = self.records.iter().position(|r| r.name == name_or_path) {
            return Some(i);
        }
        let path = Path::new(name_or_path);
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.records
            .iter()
            .position(|r| r.path == canonical || r.path == path)
    }

    /// Register the plugin at `path` (its directory or its `plugin.toml`).
    pub async fn add(&mut self, path: &Path) -> Result<&PluginRecord, BridgeError> {
        let (manifest, dir) = read_manifest(path)?;
        // Plugin names double as storage namespaces; the registry's own
        // namespace also holds the shared aggregator identity.
        if manifest.name == self.storage.namespace() {
            return Err(BridgeError::Manifest(format!(
                "plugin name `{}` is reserved",
                manifest.name
            )));
        }
        if self.get(&manifest.name).is_some() {
            return Err(BridgeError::Duplicate {
                plugin: manifest.name,
            });
        }

        self.records.push(PluginRecord::from_manifest(manifest, dir));
        if let Err(e) = self.persist().await {
            self.records.pop();
            return Err(e);
        }

        let index = self.records.len() - 1;
        let record = &self.records[index];
        info!(plugin = %record.name, path = %record.path.display(), "plugin added");
        Ok(record)
    }

    /// Remove a plugin by name or installation path.
    pub async fn remove(&mut self, name_or_path: &str) -> Result<PluginRecord, BridgeError> {
        let index = self
            .position(name_or_path)
            .ok_or_else(|| BridgeError::NotFound {
                plugin: name_or_path.to_string(),
            })?;

        let removed = self.records.remove(index);
        if let Err(e) = self.persist().await {
            self.records.insert(index, removed);
            return Err(e);
        }

        info!(plugin = %removed.name, "plugin removed");
        Ok(removed)
    }

    /// Enable or disable a plugin.
    pub async fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), BridgeError> {
        let record = self.get_mut(name).ok_or_else(|| BridgeError::NotFound {
            plugin: name.to_string(),
        })?;
        let previous = std::mem::replace(&mut record.enabled, enabled);

        if let Err(e) = self.persist().await {
            if let Some(record) = self.get_mut(name) {
                record.enabled = previous;
            }
            return Err(e);
        }

        info!(plugin = %name, enabled, "plugin enablement changed");
        Ok(())
    }

    /// Write the full record set.
    pub async fn persist(&self) -> Result<(), BridgeError> {
        self.storage.set(REGISTRY_KEY, &self.records).await
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("records", &self.records)
            .finish()
    }
}
