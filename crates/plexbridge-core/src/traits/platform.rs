// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime interface every plugin platform implements.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::CapabilityType;

/// A loaded plugin instance.
///
/// The bridge calls [`on_start`](Platform::on_start) once the plugin's
/// hosting endpoint is ready to receive devices, and
/// [`on_shutdown`](Platform::on_shutdown) when the process is closing.
/// Devices are registered through the [`DeviceHost`](crate::DeviceHost) the plugin received
/// from its factory.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Human-readable name of the platform instance.
    fn name(&self) -> &str;

    /// The capability this platform implements. Must match the manifest.
    fn capability(&self) -> CapabilityType;

    /// Start the platform and register its devices.
    async fn on_start(&self, reason: &str) -> Result<(), BridgeError>;

    /// Release resources before the process exits.
    async fn on_shutdown(&self, reason: &str) -> Result<(), BridgeError>;
}
