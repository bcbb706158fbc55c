// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The back-reference a plugin receives from its factory.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::Device;

/// Device registration surface handed to each plugin at load time.
///
/// Every call is attributed to the plugin the host was created for.
#[async_trait]
pub trait DeviceHost: Send + Sync + 'static {
    /// Name of the plugin this host belongs to.
    fn plugin_name(&self) -> &str;

    /// Register a device whose basic information is mirrored into bridged
    /// information when it is exposed behind an aggregator.
    async fn add_device(&self, device: Device) -> Result<(), BridgeError>;

    /// Register a device that already carries bridged information.
    async fn add_bridged_device(&self, device: Device) -> Result<(), BridgeError>;
}
