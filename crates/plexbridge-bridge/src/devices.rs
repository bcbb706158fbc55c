// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Devices contributed by plugins and whether each is attached.
//!
//! Records live for the process lifetime only. A record is marked attached
//! only after its hosting endpoint accepted it, and never attached twice.

use plexbridge_core::{BridgeError, Device, DeviceId, DeviceKind, Endpoint};

/// One device reported by a plugin.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Name of the plugin that registered the device.
    pub plugin: String,
    pub device: Device,
    /// Whether it arrived through `add_device` or `add_bridged_device`.
    pub kind: DeviceKind,
    attached: bool,
}

impl DeviceRecord {
    /// Whether the hosting endpoint accepted the device.
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Device records in registration order.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    records: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new, unattached device for `plugin`.
    pub fn insert(
        &mut self,
        plugin: &str,
        device: Device,
        kind: DeviceKind,
    ) -> Result<(), BridgeError> {
        if self.get(plugin, &device.id).is_some() {
            return Err(BridgeError::DuplicateDevice {
                plugin: plugin.to_string(),
                device: device.id.to_string(),
            });
        }
        self.records.push(DeviceRecord {
            plugin: plugin.to_string(),
            device,
            kind,
            attached: false,
        });
        Ok(())
    }

    /// Drop a record. Used to undo an insert whose attach failed.
    pub fn remove(&mut self, plugin: &str, id: &DeviceId) -> Option<DeviceRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.plugin == plugin && &r.device.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn get(&self, plugin: &str, id: &DeviceId) -> Option<&DeviceRecord> {
        self.records
            .iter()
            .find(|r| r.plugin == plugin && &r.device.id == id)
    }

    /// Every record, in registration order.
    pub fn all(&self) -> &[DeviceRecord] {
        &self.records
    }

    /// Records of `plugin`, in registration order.
    pub fn for_plugin<'a>(
        &'a self,
        plugin: &'a str,
    ) -> impl Iterator<Item = &'a DeviceRecord> + 'a {
        self.records.iter().filter(move |r| r.plugin == plugin)
    }

    /// First device `plugin` registered.
    pub fn first_for(&self, plugin: &str) -> Option<&DeviceRecord> {
        self.records.iter().find(|r| r.plugin == plugin)
    }

    /// Attach one device to `endpoint`. Returns `false` if it already was.
    pub fn attach(
        &mut self,
        plugin: &str,
        id: &DeviceId,
        endpoint: &dyn Endpoint,
    ) -> Result<bool, BridgeError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.plugin == plugin && &r.device.id == id)
            .ok_or_else(|| BridgeError::Internal(format!("device {id} of {plugin} is unknown")))?;
        if record.attached {
            return Ok(false);
        }
        endpoint.add_device(&record.device, record.kind)?;
        record.attached = true;
        Ok(true)
    }

    /// Attach every unattached device of `plugin` to `endpoint`, in
    /// registration order. Stops at the first device the endpoint rejects;
    /// devices attached before it stay attached.
    pub fn attach_pending(
        &mut self,
        plugin: &str,
        endpoint: &dyn Endpoint,
    ) -> Result<Vec<DeviceId>, BridgeError> {
        let mut attached = Vec::new();
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.plugin == plugin && !r.attached)
        {
            endpoint.add_device(&record.device, record.kind)?;
            record.attached = true;
            attached.push(record.device.id.clone());
        }
        Ok(attached)
    }

    /// Number of devices `plugin` registered.
    pub fn count(&self, plugin: &str) -> usize {
        self.for_plugin(plugin).count()
    }
}
