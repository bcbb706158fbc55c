// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the registry, the lifecycle coordinator, and the
//! protocol engine collaborator.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device type code of an aggregator endpoint.
pub const AGGREGATOR_DEVICE_TYPE: u32 = 0x000e;

/// Maximum length of vendor and product strings exposed to controllers.
pub const MAX_LABEL_LEN: usize = 32;

/// What a plugin declares it contributes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum CapabilityType {
    /// A single device, commissioned on its own in per-plugin mode.
    #[strum(serialize = "AccessoryPlatform")]
    #[serde(rename = "AccessoryPlatform")]
    SingleDevice,
    /// Any number of devices behind an aggregator.
    #[strum(serialize = "DynamicPlatform")]
    #[serde(rename = "DynamicPlatform")]
    MultiDevice,
}

/// How commissioning endpoints are laid out. Fixed for the process lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Topology {
    /// One endpoint with one aggregator shared by every plugin.
    #[default]
    #[strum(to_string = "bridge", serialize = "single-aggregator")]
    #[serde(rename = "bridge", alias = "single-aggregator")]
    SingleAggregator,
    /// One endpoint per plugin.
    #[strum(to_string = "childbridge", serialize = "per-plugin")]
    #[serde(rename = "childbridge", alias = "per-plugin")]
    PerPlugin,
}

/// Per-plugin lifecycle state. Ordered; transitions only move forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PluginState {
    #[default]
    Registered,
    Loading,
    Loaded,
    Starting,
    Started,
    AwaitingConnection,
    Connected,
}

/// The lifecycle step during which a plugin failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStage {
    Load,
    Endpoint,
    Start,
    Attach,
}

/// Identifier of a device, unique within its plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Basic information attributes a device exposes to controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInformation {
    pub node_label: String,
    pub vendor_id: u16,
    pub vendor_name: String,
    pub product_id: u16,
    pub product_name: String,
    pub serial_number: Option<String>,
    pub unique_id: Option<String>,
    pub software_version: Option<u32>,
    pub software_version_string: Option<String>,
    pub hardware_version: Option<u32>,
    pub hardware_version_string: Option<String>,
}

/// A device contributed by a plugin.
///
/// The bridge treats it as opaque apart from the identity data it needs to
/// build hosting endpoints; the engine owns its cluster model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub device_type: u32,
    pub basic: Option<BasicInformation>,
}

impl Device {
    /// Create a device without basic information.
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: u32) -> Self {
        Self {
            id: DeviceId(id.into()),
            name: name.into(),
            device_type,
            basic: None,
        }
    }

    /// Attach basic information.
    pub fn with_basic(mut self, basic: BasicInformation) -> Self {
        self.basic = Some(basic);
        self
    }
}

/// How a device is presented once attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Registered through `add_device`; bridged by mirroring its basic information.
    Standalone,
    /// Registered through `add_bridged_device`; already carries bridged information.
    Bridged,
}

/// Shape of a hosting endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Commissioning endpoint holding devices directly.
    Bare,
    /// Commissioning endpoint with an aggregator holding devices as children.
    Aggregator,
}

/// Serial and unique id of an aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorIdentity {
    pub serial_number: String,
    pub unique_id: String,
}

/// Everything the engine needs to construct a commissioning endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointIdentity {
    /// Storage key of the endpoint; also the key events are reported under.
    pub storage_key: String,
    pub kind: EndpointKind,
    pub device_name: String,
    pub device_type: u32,
    pub vendor_id: u16,
    pub vendor_name: String,
    pub product_id: u16,
    pub product_name: String,
    pub serial_number: String,
    pub unique_id: String,
    pub software_version: u32,
    pub software_version_string: String,
    pub hardware_version: u32,
    pub hardware_version_string: String,
    pub aggregator: Option<AggregatorIdentity>,
}

/// Index of a controller fabric on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FabricIndex(pub u8);

impl std::fmt::Display for FabricIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One active session reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub peer_active: bool,
    pub secure: bool,
    pub active_subscriptions: u32,
}

impl SessionInfo {
    /// A controller is ready once it holds a live secure session with a subscription.
    pub fn is_controller_ready(&self) -> bool {
        self.peer_active && self.secure && self.active_subscriptions >= 1
    }
}

/// Notifications delivered by the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The set of active sessions on an endpoint changed.
    SessionsChanged {
        endpoint: String,
        fabric: FabricIndex,
        sessions: Vec<SessionInfo>,
    },
    /// Commissioning on an endpoint changed; `fabrics` is what remains.
    CommissioningChanged {
        endpoint: String,
        fabric: FabricIndex,
        fabrics: usize,
    },
}

impl EngineEvent {
    /// Storage key of the endpoint the event concerns.
    pub fn endpoint(&self) -> &str {
        match self {
            EngineEvent::SessionsChanged { endpoint, .. }
            | EngineEvent::CommissioningChanged { endpoint, .. } => endpoint,
        }
    }
}

/// Pairing material for an uncommissioned endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCode {
    pub qr_pairing_code: String,
    pub manual_pairing_code: String,
}

/// Truncate a label to the length controllers accept.
pub fn truncate_label(label: &str) -> String {
    label.chars().take(MAX_LABEL_LEN).collect()
}
