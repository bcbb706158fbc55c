// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State shared by the coordinator, the propagator and plugin handles.
//!
//! Lock order is `plugins` then `devices`. The topology's endpoint table is
//! only ever held inside its own methods, and no lock is held across a
//! platform's `on_start` or `on_shutdown`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use plexbridge_config::LifecycleConfig;
use plexbridge_core::{
    BridgeError, DeviceId, KeyValueStore, LifecycleStage, PluginState, ProtocolEngine,
};
use plexbridge_plugin::{PluginRecord, PluginRegistry};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::devices::DeviceRegistry;
use crate::topology::{EndpointOwner, TopologyController};

pub(crate) struct BridgeShared {
    pub topology: TopologyController,
    pub plugins: Mutex<PluginRegistry>,
    pub devices: Mutex<DeviceRegistry>,
    pub engine: Arc<dyn ProtocolEngine>,
    pub store: Arc<dyn KeyValueStore>,
    pub lifecycle: LifecycleConfig,
    pub engine_started: AtomicBool,
    pub shutdown_started: AtomicBool,
    /// Cancels settle tasks scheduled after a controller connected.
    pub deferred: CancellationToken,
}

/// Log a plugin failure and record it on the plugin.
pub(crate) fn record_failure(record: &mut PluginRecord, stage: LifecycleStage, err: &BridgeError) {
    error!(plugin = %record.name, stage = %stage, error = %err, "plugin failed");
    record.mark_failed(stage, err.to_string());
}

impl BridgeShared {
    pub async fn fail(&self, plugin: &str, stage: LifecycleStage, err: &BridgeError) {
        let mut plugins = self.plugins.lock().await;
        match plugins.get_mut(plugin) {
            Some(record) => record_failure(record, stage, err),
            None => error!(plugin, stage = %stage, error = %err, "unregistered plugin failed"),
        }
    }

    pub async fn advance(&self, plugin: &str, next: PluginState) -> bool {
        let mut plugins = self.plugins.lock().await;
        plugins
            .get_mut(plugin)
            .is_some_and(|record| record.advance(next))
    }

    /// Plugins whose devices `owner`'s endpoint hosts.
    ///
    /// The shared endpoint hosts every plugin that has started.
    pub async fn owned_plugins(&self, owner: &EndpointOwner) -> Vec<String> {
        match owner {
            EndpointOwner::Plugin(name) => vec![name.clone()],
            EndpointOwner::Shared => self
                .plugins
                .lock()
                .await
                .list()
                .iter()
                .filter(|r| r.is_loaded() && r.is_started())
                .map(|r| r.name.clone())
                .collect(),
        }
    }

    pub async fn set_paired(&self, plugins: &[String], paired: bool) {
        let mut registry = self.plugins.lock().await;
        for name in plugins {
            if let Some(record) = registry.get_mut(name) {
                record.paired = paired;
            }
        }
    }

    /// Attach `plugin`'s pending devices and mark every attached one reachable.
    pub async fn expose_devices(&self, plugin: &str) -> Result<Vec<DeviceId>, BridgeError> {
        let endpoint = self
            .topology
            .endpoint_for(plugin)
            .await
            .ok_or_else(|| BridgeError::EndpointCreation {
                plugin: plugin.to_string(),
                reason: "no hosting endpoint exists".to_string(),
            })?;

        let mut devices = self.devices.lock().await;
        let attached = devices.attach_pending(plugin, endpoint.as_ref())?;
        for record in devices.for_plugin(plugin).filter(|r| r.is_attached()) {
            endpoint.set_device_reachable(&record.device.id, true);
        }
        Ok(attached)
    }
}
