// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifests, the persisted plugin registry, and the platform loader.
//!
//! A plugin is a directory with a `plugin.toml` manifest. The
//! [`PluginRegistry`] keeps the ordered set of installed plugins and their
//! enablement; the [`PluginLoader`] turns a record into a running
//! [`PlatformHandle`] through a compiled-in [`PlatformFactory`].

pub mod loader;
pub mod manifest;
pub mod record;
pub mod registry;

pub use loader::{PlatformFactory, PluginLoader};
pub use manifest::{PluginManifest, parse_plugin_manifest, read_manifest};
pub use record::{PlatformHandle, PluginFailure, PluginRecord};
pub use registry::{PluginRegistry, REGISTRY_KEY};
