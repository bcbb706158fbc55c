// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin and device lifecycle orchestration for the plexbridge bridge.
//!
//! - [`Bridge`]: loads plugins, synthesizes the "all started" barrier and
//!   starts the protocol engine once
//! - [`TopologyController`]: builds the hosting endpoints for the configured
//!   topology, with identities that survive restarts
//! - [`DeviceRegistry`]: devices per plugin and their attachment
//! - [`ReachabilityPropagator`]: connection and commissioning notifications,
//!   and shutdown
//! - [`BridgeHandle`]: what each plugin registers its devices through

pub mod barrier;
pub mod devices;
pub mod handle;
pub mod lifecycle;
pub mod pairing;
pub mod reachability;
pub mod shutdown;
pub mod snapshot;
pub mod topology;

mod shared;

pub use barrier::{BarrierOutcome, StartBarrier, StartTicket};
pub use devices::{DeviceRecord, DeviceRegistry};
pub use handle::BridgeHandle;
pub use lifecycle::{Bridge, start_reason};
pub use pairing::{render_qr, store_pairing, stored_pairing};
pub use reachability::ReachabilityPropagator;
pub use shutdown::install_signal_handler;
pub use snapshot::{BridgeSnapshot, DeviceStatus, EndpointStatus, PluginStatus};
pub use topology::{BRIDGE_NAMESPACE, EndpointOwner, HostedEndpoint, TopologyController, stable_id};
