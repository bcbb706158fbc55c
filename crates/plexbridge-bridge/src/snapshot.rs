// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only status view of the bridge.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use plexbridge_core::{
    CapabilityType, DeviceKind, EndpointKind, PairingCode, PluginState, Topology,
};
use plexbridge_plugin::PluginFailure;
use serde::Serialize;

use crate::shared::BridgeShared;
use crate::topology::EndpointOwner;

/// Everything an operator can see about a running bridge.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeSnapshot {
    pub topology: Topology,
    pub engine_started: bool,
    pub plugins: Vec<PluginStatus>,
    pub devices: Vec<DeviceStatus>,
    pub endpoints: Vec<EndpointStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub path: PathBuf,
    pub version: String,
    pub description: String,
    pub author: Option<String>,
    pub capability: CapabilityType,
    pub enabled: bool,
    pub state: PluginState,
    pub loaded: bool,
    pub started: bool,
    pub paired: bool,
    pub connected: bool,
    pub device_count: usize,
    pub failure: Option<PluginFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub plugin: String,
    pub id: String,
    pub name: String,
    pub device_type: u32,
    pub serial_number: Option<String>,
    pub unique_id: Option<String>,
    pub kind: DeviceKind,
    pub attached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub storage_key: String,
    pub owner: EndpointOwner,
    pub kind: EndpointKind,
    pub serial_number: String,
    pub unique_id: String,
    pub commissioned: bool,
    /// Present while the endpoint awaits commissioning.
    pub pairing: Option<PairingCode>,
}

impl BridgeSnapshot {
    pub fn plugin(&self, name: &str) -> Option<&PluginStatus> {
        self.plugins.iter().find(|p| p.name == name)
    }
}

pub(crate) async fn collect(shared: &BridgeShared) -> BridgeSnapshot {
    let endpoints = shared
        .topology
        .hosted()
        .await
        .into_iter()
        .map(|hosted| {
            let commissioned = hosted.endpoint.is_commissioned();
            let pairing = if commissioned {
                None
            } else {
                hosted.endpoint.pairing_code().ok()
            };
            EndpointStatus {
                storage_key: hosted.identity.storage_key,
                owner: hosted.owner,
                kind: hosted.identity.kind,
                serial_number: hosted.identity.serial_number,
                unique_id: hosted.identity.unique_id,
                commissioned,
                pairing,
            }
        })
        .collect();

    let plugins = shared
        .plugins
        .lock()
        .await
        .list()
        .iter()
        .map(|r| PluginStatus {
            name: r.name.clone(),
            path: r.path.clone(),
            version: r.version.clone(),
            description: r.description.clone(),
            author: r.author.clone(),
            capability: r.capability,
            enabled: r.enabled,
            state: r.state(),
            loaded: r.is_loaded(),
            started: r.is_started(),
            paired: r.paired,
            connected: r.is_connected(),
            device_count: r.device_count(),
            failure: r.failure().cloned(),
        })
        .collect();

    let devices = shared
        .devices
        .lock()
        .await
        .all()
        .iter()
        .map(|r| {
            let basic = r.device.basic.as_ref();
            DeviceStatus {
                plugin: r.plugin.clone(),
                id: r.device.id.to_string(),
                name: r.device.name.clone(),
                device_type: r.device.device_type,
                serial_number: basic.and_then(|b| b.serial_number.clone()),
                unique_id: basic.and_then(|b| b.unique_id.clone()),
                kind: r.kind,
                attached: r.is_attached(),
            }
        })
        .collect();

    BridgeSnapshot {
        topology: shared.topology.topology(),
        engine_started: shared.engine_started.load(Ordering::SeqCst),
        plugins,
        devices,
        endpoints,
    }
}
