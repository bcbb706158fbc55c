// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the bridge.
//!
//! Plugins implement [`Platform`] and register devices through a
//! [`DeviceHost`]; the commissioning protocol engine
//! implements [`ProtocolEngine`] and [`Endpoint`]; persistence backends
//! implement [`KeyValueStore`]. All async traits use `#[async_trait]` for
//! dynamic dispatch.

pub mod engine;
pub mod host;
pub mod platform;
pub mod storage;

pub use engine::{Endpoint, EventSender, ProtocolEngine};
pub use host::DeviceHost;
pub use platform::Platform;
pub use storage::{KeyValueStore, StorageContext};
