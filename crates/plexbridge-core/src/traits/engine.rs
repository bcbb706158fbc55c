// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commissioning protocol engine collaborator.
//!
//! The engine owns pairing, secure sessions, and fabrics. The bridge only
//! asks it to build endpoints, to start and stop, and listens to the
//! session/commissioning notifications it emits on the [`EventSender`]
//! handed over at endpoint creation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::types::{Device, DeviceId, DeviceKind, EndpointIdentity, EngineEvent, PairingCode};

/// Channel the engine reports endpoint events on.
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// The shared protocol engine. Started at most once per process.
#[async_trait]
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Build a commissioning endpoint (and its aggregator, for
    /// [`EndpointKind::Aggregator`](crate::types::EndpointKind::Aggregator)).
    ///
    /// Events for the endpoint are sent on `events`, keyed by
    /// `identity.storage_key`.
    async fn create_endpoint(
        &self,
        identity: &EndpointIdentity,
        events: EventSender,
    ) -> Result<Arc<dyn Endpoint>, BridgeError>;

    /// Start serving every endpoint created so far.
    async fn start(&self) -> Result<(), BridgeError>;

    /// Stop serving and close all sessions.
    async fn stop(&self) -> Result<(), BridgeError>;
}

/// A commissioning endpoint built by the engine.
///
/// Structural operations are synchronous; they never wait on the network.
pub trait Endpoint: Send + Sync + 'static {
    /// Storage key the endpoint was created with.
    fn storage_key(&self) -> &str;

    /// Expose a device on this endpoint (as an aggregator child when the
    /// endpoint has one).
    fn add_device(&self, device: &Device, kind: DeviceKind) -> Result<(), BridgeError>;

    /// Publish endpoint-level reachability.
    fn set_reachable(&self, reachable: bool);

    /// Publish reachability of one attached device.
    fn set_device_reachable(&self, device: &DeviceId, reachable: bool);

    /// Whether at least one fabric has commissioned this endpoint.
    fn is_commissioned(&self) -> bool;

    /// Pairing material for commissioning this endpoint.
    fn pairing_code(&self) -> Result<PairingCode, BridgeError>;
}
