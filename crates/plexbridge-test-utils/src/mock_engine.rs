// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock protocol engine and endpoints.
//!
//! `MockEngine` records every endpoint it builds and every start/stop call,
//! and lets tests inject session and commissioning events as if a controller
//! were talking to an endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use plexbridge_core::{
    BridgeError, Device, DeviceId, DeviceKind, Endpoint, EndpointIdentity, EngineEvent,
    EventSender, FabricIndex, PairingCode, ProtocolEngine, SessionInfo,
};
use tokio::sync::watch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A commissioning endpoint that records what the bridge does to it.
pub struct MockEndpoint {
    identity: EndpointIdentity,
    devices: Mutex<Vec<(DeviceId, DeviceKind)>>,
    reachable: Mutex<Vec<bool>>,
    device_reachable: Mutex<Vec<(DeviceId, bool)>>,
    commissioned: AtomicBool,
    reject_devices: AtomicBool,
}

impl MockEndpoint {
    fn new(identity: EndpointIdentity) -> Self {
        Self {
            identity,
            devices: Mutex::new(Vec::new()),
            reachable: Mutex::new(Vec::new()),
            device_reachable: Mutex::new(Vec::new()),
            commissioned: AtomicBool::new(false),
            reject_devices: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &EndpointIdentity {
        &self.identity
    }

    /// Devices attached so far, in attach order.
    pub fn attached(&self) -> Vec<DeviceId> {
        lock(&self.devices).iter().map(|(id, _)| id.clone()).collect()
    }

    /// Number of `add_device` calls that succeeded.
    pub fn attach_count(&self) -> usize {
        lock(&self.devices).len()
    }

    /// Every value passed to `set_reachable`.
    pub fn reachable_history(&self) -> Vec<bool> {
        lock(&self.reachable).clone()
    }

    /// Every `(device, value)` passed to `set_device_reachable`.
    pub fn device_reachable_history(&self) -> Vec<(DeviceId, bool)> {
        lock(&self.device_reachable).clone()
    }

    pub fn set_commissioned(&self, commissioned: bool) {
        self.commissioned.store(commissioned, Ordering::SeqCst);
    }

    /// Make every following `add_device` call fail.
    pub fn reject_devices(&self) {
        self.reject_devices.store(true, Ordering::SeqCst);
    }
}

impl Endpoint for MockEndpoint {
    fn storage_key(&self) -> &str {
        &self.identity.storage_key
    }

    fn add_device(&self, device: &Device, kind: DeviceKind) -> Result<(), BridgeError> {
        if self.reject_devices.load(Ordering::SeqCst) {
            return Err(BridgeError::ProtocolEngine(format!(
                "endpoint {} rejected device {}",
                self.identity.storage_key, device.id
            )));
        }
        lock(&self.devices).push((device.id.clone(), kind));
        Ok(())
    }

    fn set_reachable(&self, reachable: bool) {
        lock(&self.reachable).push(reachable);
    }

    fn set_device_reachable(&self, device: &DeviceId, reachable: bool) {
        lock(&self.device_reachable).push((device.clone(), reachable));
    }

    fn is_commissioned(&self) -> bool {
        self.commissioned.load(Ordering::SeqCst)
    }

    fn pairing_code(&self) -> Result<PairingCode, BridgeError> {
        Ok(PairingCode {
            qr_pairing_code: format!("MT:{}", self.identity.serial_number),
            manual_pairing_code: "3497-0112-332".to_string(),
        })
    }
}

/// A protocol engine that never touches the network.
pub struct MockEngine {
    endpoints: Mutex<Vec<Arc<MockEndpoint>>>,
    senders: Mutex<HashMap<String, EventSender>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    fail_start: AtomicBool,
    started: watch::Sender<bool>,
}

impl MockEngine {
    pub fn new() -> Self {
        let (started, _) = watch::channel(false);
        Self {
            endpoints: Mutex::new(Vec::new()),
            senders: Mutex::new(HashMap::new()),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            fail_start: AtomicBool::new(false),
            started,
        }
    }

    /// Make `start()` fail.
    pub fn fail_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Wait until `start()` has succeeded once.
    pub async fn wait_started(&self) {
        let mut rx = self.started.subscribe();
        let _ = rx.wait_for(|started| *started).await;
    }

    /// Endpoints in creation order.
    pub fn endpoints(&self) -> Vec<Arc<MockEndpoint>> {
        lock(&self.endpoints).clone()
    }

    pub fn endpoint(&self, storage_key: &str) -> Option<Arc<MockEndpoint>> {
        lock(&self.endpoints)
            .iter()
            .find(|e| e.storage_key() == storage_key)
            .cloned()
    }

    /// Deliver `event` on the channel of the endpoint it names.
    pub fn emit(&self, event: EngineEvent) -> bool {
        let senders = lock(&self.senders);
        match senders.get(event.endpoint()) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Report a ready controller session on `storage_key`.
    pub fn connect(&self, storage_key: &str) -> bool {
        self.emit(EngineEvent::SessionsChanged {
            endpoint: storage_key.to_string(),
            fabric: FabricIndex(1),
            sessions: vec![SessionInfo {
                peer_active: true,
                secure: true,
                active_subscriptions: 1,
            }],
        })
    }

    /// Report a commissioning change on `storage_key` leaving `fabrics` fabrics.
    pub fn commissioning_changed(&self, storage_key: &str, fabrics: usize) -> bool {
        self.emit(EngineEvent::CommissioningChanged {
            endpoint: storage_key.to_string(),
            fabric: FabricIndex(1),
            fabrics,
        })
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolEngine for MockEngine {
    async fn create_endpoint(
        &self,
        identity: &EndpointIdentity,
        events: EventSender,
    ) -> Result<Arc<dyn Endpoint>, BridgeError> {
        let endpoint = Arc::new(MockEndpoint::new(identity.clone()));
        lock(&self.endpoints).push(endpoint.clone());
        lock(&self.senders).insert(identity.storage_key.clone(), events);
        Ok(endpoint)
    }

    async fn start(&self) -> Result<(), BridgeError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(BridgeError::ProtocolEngine("port 5540 in use".to_string()));
        }
        self.started.send_replace(true);
        Ok(())
    }

    async fn stop(&self) -> Result<(), BridgeError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
