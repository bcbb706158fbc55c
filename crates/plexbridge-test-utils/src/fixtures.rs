// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device fixtures.

use plexbridge_core::{BasicInformation, Device};

/// Device type code of an on/off light.
pub const ON_OFF_LIGHT: u32 = 0x0100;

/// Basic information as a real accessory would report it.
pub fn basic_information(label: &str) -> BasicInformation {
    BasicInformation {
        node_label: label.to_string(),
        vendor_id: 0x1234,
        vendor_name: "Acme".to_string(),
        product_id: 0x0042,
        product_name: format!("{label} product"),
        serial_number: Some(format!("SN-{label}")),
        unique_id: Some(format!("UID-{label}")),
        software_version: Some(3),
        software_version_string: Some("3.0.0".to_string()),
        hardware_version: None,
        hardware_version_string: None,
    }
}

/// A light with basic information.
pub fn light(id: &str) -> Device {
    Device::new(id, id, ON_OFF_LIGHT).with_basic(basic_information(id))
}

/// A light without basic information.
pub fn bare_light(id: &str) -> Device {
    Device::new(id, id, ON_OFF_LIGHT)
}
