// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The back-reference each plugin receives for registering devices.

use std::sync::Weak;

use async_trait::async_trait;
use plexbridge_core::{
    BridgeError, CapabilityType, Device, DeviceHost, DeviceKind, Topology,
};
use tracing::info;

use crate::shared::BridgeShared;

/// A plugin's view of the bridge.
///
/// Holds the bridge weakly: the plugin's platform lives inside the bridge, so
/// a strong reference would keep both alive forever.
pub struct BridgeHandle {
    plugin: String,
    shared: Weak<BridgeShared>,
}

impl BridgeHandle {
    pub(crate) fn new(plugin: impl Into<String>, shared: Weak<BridgeShared>) -> Self {
        Self {
            plugin: plugin.into(),
            shared,
        }
    }

    async fn register(&self, device: Device, kind: DeviceKind) -> Result<(), BridgeError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or_else(|| BridgeError::Internal("the bridge has been dropped".to_string()))?;

        let mut plugins = shared.plugins.lock().await;
        let record = plugins
            .get_mut(&self.plugin)
            .ok_or_else(|| BridgeError::NotFound {
                plugin: self.plugin.clone(),
            })?;
        if !record.is_loaded() {
            return Err(BridgeError::NotLoaded {
                plugin: self.plugin.clone(),
            });
        }

        let topology = shared.topology.topology();
        if topology == Topology::SingleAggregator
            && kind == DeviceKind::Standalone
            && device.basic.is_none()
        {
            return Err(BridgeError::InvalidDevice {
                plugin: self.plugin.clone(),
                device: device.id.to_string(),
                reason: "add_device requires basic information".to_string(),
            });
        }

        let connected = record.is_connected();
        let endpoint = shared.topology.endpoint_for(&self.plugin).await;
        let target = match (topology, record.capability) {
            (Topology::SingleAggregator, _) | (Topology::PerPlugin, CapabilityType::SingleDevice) => {
                endpoint
            }
            // Surfaced only once a controller is paired and connected.
            (Topology::PerPlugin, CapabilityType::MultiDevice) => endpoint.filter(|_| connected),
        };

        let id = device.id.clone();
        let mut devices = shared.devices.lock().await;
        devices.insert(&self.plugin, device, kind)?;
        if let Some(endpoint) = &target {
            if let Err(e) = devices.attach(&self.plugin, &id, endpoint.as_ref()) {
                devices.remove(&self.plugin, &id);
                return Err(e);
            }
            if connected {
                endpoint.set_device_reachable(&id, true);
            }
        }
        drop(devices);

        record.record_device();
        info!(
            plugin = %self.plugin,
            device = %id,
            kind = %kind,
            attached = target.is_some(),
            "device registered"
        );
        Ok(())
    }
}

#[async_trait]
impl DeviceHost for BridgeHandle {
    fn plugin_name(&self) -> &str {
        &self.plugin
    }

    async fn add_device(&self, device: Device) -> Result<(), BridgeError> {
        self.register(device, DeviceKind::Standalone).await
    }

    async fn add_bridged_device(&self, device: Device) -> Result<(), BridgeError> {
        self.register(device, DeviceKind::Bridged).await
    }
}
