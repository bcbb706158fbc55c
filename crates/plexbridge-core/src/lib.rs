// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the plexbridge device bridge.
//!
//! This crate provides the error type, the shared lifecycle and device
//! types, and the collaborator traits (plugin platform, protocol engine,
//! persistence) used throughout the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BridgeError;
pub use types::{
    AggregatorIdentity, BasicInformation, CapabilityType, Device, DeviceId, DeviceKind,
    EndpointIdentity, EndpointKind, EngineEvent, FabricIndex, LifecycleStage, PairingCode,
    PluginState, SessionInfo, Topology,
};

pub use traits::{
    DeviceHost, Endpoint, EventSender, KeyValueStore, Platform, ProtocolEngine, StorageContext,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_collaborator_traits_are_exported() {
        // Compile-time check that the collaborator traits stay object safe.
        fn _platform(_: &dyn Platform) {}
        fn _engine(_: &dyn ProtocolEngine) {}
        fn _endpoint(_: &dyn Endpoint) {}
        fn _store(_: &dyn KeyValueStore) {}
        fn _host(_: &dyn DeviceHost) {}
    }

    #[test]
    fn device_builder_sets_basic_information() {
        let device = Device::new("lamp-1", "Lamp", 0x0100).with_basic(BasicInformation {
            node_label: "Lamp".into(),
            vendor_id: 0xfff1,
            vendor_name: "Acme".into(),
            product_id: 0x8000,
            product_name: "Lamp".into(),
            serial_number: None,
            unique_id: None,
            software_version: None,
            software_version_string: None,
            hardware_version: None,
            hardware_version_string: None,
        });
        assert_eq!(device.id, DeviceId("lamp-1".into()));
        assert_eq!(device.basic.as_ref().unwrap().vendor_name, "Acme");
    }
}
