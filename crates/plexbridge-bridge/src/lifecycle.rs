// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lifecycle coordinator.
//!
//! [`Bridge::run`] drives every enabled plugin through
//! `loading -> loaded -> starting -> started`, waits on a [`StartBarrier`]
//! until each one has started or failed, starts the protocol engine once,
//! then hands engine notifications to the [`ReachabilityPropagator`] until
//! cancelled.
//!
//! Per-plugin failures are recorded on the plugin and resolve its barrier
//! slot; they never abort the others. A barrier timeout and engine failures
//! abort startup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use plexbridge_config::PlexbridgeConfig;
use plexbridge_core::{
    BridgeError, CapabilityType, DeviceHost, EngineEvent, KeyValueStore, LifecycleStage,
    PluginState, ProtocolEngine, StorageContext, Topology,
};
use plexbridge_plugin::{PlatformHandle, PluginLoader, PluginRegistry};
use sysinfo::System;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use crate::barrier::{BarrierOutcome, StartBarrier, StartTicket};
use crate::devices::DeviceRegistry;
use crate::handle::BridgeHandle;
use crate::pairing::{render_qr, store_pairing};
use crate::reachability::ReachabilityPropagator;
use crate::shared::{BridgeShared, record_failure};
use crate::snapshot::{self, BridgeSnapshot};
use crate::topology::TopologyController;

const BRIDGE_READY: &str = "bridge aggregator is ready";
const ACCESSORY_READY: &str = "accessory platform has started commissioning";
const DYNAMIC_READY: &str = "dynamic platform has started commissioning";

/// The reason string passed to a platform's `on_start`.
pub fn start_reason(topology: Topology, capability: CapabilityType) -> &'static str {
    match (topology, capability) {
        (Topology::SingleAggregator, _) => BRIDGE_READY,
        (Topology::PerPlugin, CapabilityType::SingleDevice) => ACCESSORY_READY,
        (Topology::PerPlugin, CapabilityType::MultiDevice) => DYNAMIC_READY,
    }
}

/// Orchestrates plugins, hosting endpoints and the protocol engine.
///
/// Cheap to clone; clones share one bridge.
///
/// An embedding process wires its engine and plugin factories in and maps a
/// fatal startup error to a failing exit code:
///
/// ```no_run
/// use std::process::ExitCode;
/// use std::sync::Arc;
///
/// use plexbridge_bridge::{BRIDGE_NAMESPACE, Bridge, install_signal_handler};
/// use plexbridge_core::StorageContext;
/// use plexbridge_plugin::{PluginLoader, PluginRegistry};
/// use plexbridge_test_utils::{MemoryStore, MockEngine, MockPlugin};
///
/// #[tokio::main]
/// async fn main() -> ExitCode {
///     let config = plexbridge_config::load_config().unwrap_or_default();
///     let store = Arc::new(MemoryStore::new());
///     let engine = Arc::new(MockEngine::new());
///
///     let Ok(registry) =
///         PluginRegistry::open(StorageContext::new(store.clone(), BRIDGE_NAMESPACE)).await
///     else {
///         return ExitCode::FAILURE;
///     };
///     let mut loader = PluginLoader::new();
///     let hue = MockPlugin::multi("hue");
///     loader.register(hue.name(), hue.factory());
///
///     let bridge = Bridge::new(&config, registry, loader, engine, store);
///     match bridge.run(install_signal_handler()).await {
///         Ok(()) => ExitCode::SUCCESS,
///         Err(e) => {
///             eprintln!("bridge failed: {e}");
///             ExitCode::FAILURE
///         }
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<BridgeShared>,
    loader: Arc<PluginLoader>,
    events: Arc<Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>>,
}

impl Bridge {
    /// Build a bridge over `plugins`, resolving their entry points through
    /// `loader`. Nothing is loaded or started until [`Bridge::run`].
    pub fn new(
        config: &PlexbridgeConfig,
        plugins: PluginRegistry,
        loader: PluginLoader,
        engine: Arc<dyn ProtocolEngine>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let topology = TopologyController::new(
            config.bridge.mode,
            config.identity.clone(),
            engine.clone(),
            store.clone(),
            tx,
        );
        let shared = Arc::new(BridgeShared {
            topology,
            plugins: Mutex::new(plugins),
            devices: Mutex::new(DeviceRegistry::new()),
            engine,
            store,
            lifecycle: config.lifecycle.clone(),
            engine_started: AtomicBool::new(false),
            shutdown_started: AtomicBool::new(false),
            deferred: CancellationToken::new(),
        });
        Self {
            shared,
            loader: Arc::new(loader),
            events: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// The configured topology.
    pub fn topology(&self) -> Topology {
        self.shared.topology.topology()
    }

    /// Whether the protocol engine has been started.
    pub fn engine_started(&self) -> bool {
        self.shared.engine_started.load(Ordering::SeqCst)
    }

    /// The propagator acting on this bridge's state.
    pub fn propagator(&self) -> ReachabilityPropagator {
        ReachabilityPropagator::new(self.shared.clone())
    }

    /// A read-only view of plugins, devices and endpoints.
    pub async fn snapshot(&self) -> BridgeSnapshot {
        snapshot::collect(&self.shared).await
    }

    /// Run the bridge until `cancel` fires, then shut down.
    ///
    /// Returns the startup error after shutting down whatever did start when
    /// the barrier times out or the engine fails. Can be called once.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BridgeError> {
        let mut events = self
            .events
            .lock()
            .await
            .take()
            .ok_or_else(|| BridgeError::Internal("the bridge is already running".to_string()))?;

        if let Err(e) = self.start(&cancel).await {
            error!(error = %e, "startup failed");
            if let Err(shutdown_err) = self.shutdown("startup failed").await {
                warn!(error = %shutdown_err, "shutdown after failed startup also failed");
            }
            return Err(e);
        }

        let propagator = self.propagator();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => propagator.handle(event).await,
                    None => {
                        warn!("engine event channel closed");
                        cancel.cancelled().await;
                        break;
                    }
                },
            }
        }

        self.shutdown("shutdown requested").await
    }

    /// Shut the bridge down. Idempotent.
    pub async fn shutdown(&self, reason: &str) -> Result<(), BridgeError> {
        self.propagator().shutdown(reason).await
    }

    async fn start(&self, cancel: &CancellationToken) -> Result<(), BridgeError> {
        let shared = &self.shared;
        log_host_info(self.topology());

        if self.topology() == Topology::SingleAggregator {
            shared.topology.prepare_shared().await?;
        }

        let loaded = self.load_plugins().await;
        let mut barrier = StartBarrier::new();
        let mut drivers = JoinSet::new();
        for (name, handle) in loaded {
            let ticket = barrier.ticket(name.clone());
            drivers.spawn(drive_plugin(shared.clone(), name, handle, ticket));
        }

        let timeout = shared.lifecycle.start_timeout();
        match barrier.wait(timeout, cancel).await {
            BarrierOutcome::Released { started, failed } => {
                join_drivers(&mut drivers).await;
                self.settle_failures(&failed).await;
                info!(
                    started = started.len(),
                    failed = failed.len(),
                    "start barrier released"
                );
            }
            BarrierOutcome::TimedOut { pending } => {
                drivers.abort_all();
                join_drivers(&mut drivers).await;
                let err = BridgeError::StartupTimeout {
                    pending: pending.clone(),
                    timeout,
                };
                for plugin in &pending {
                    shared.fail(plugin, LifecycleStage::Start, &err).await;
                }
                return Err(err);
            }
            BarrierOutcome::Cancelled { pending } => {
                drivers.abort_all();
                join_drivers(&mut drivers).await;
                info!(pending = ?pending, "startup cancelled");
                return Ok(());
            }
        }

        self.start_engine().await?;
        {
            let mut plugins = shared.plugins.lock().await;
            let started: Vec<String> = plugins
                .list()
                .iter()
                .filter(|r| r.state() == PluginState::Started)
                .map(|r| r.name.clone())
                .collect();
            for name in started {
                if let Some(record) = plugins.get_mut(&name) {
                    record.advance(PluginState::AwaitingConnection);
                }
            }
        }
        self.announce_pairing().await;
        Ok(())
    }

    /// Load every enabled plugin in registry order.
    async fn load_plugins(&self) -> Vec<(String, PlatformHandle)> {
        let mut plugins = self.shared.plugins.lock().await;
        let names: Vec<String> = plugins.enabled().map(|r| r.name.clone()).collect();
        let skipped = plugins.len() - names.len();
        if skipped > 0 {
            debug!(skipped, "disabled plugins skipped");
        }

        let mut loaded = Vec::with_capacity(names.len());
        for name in names {
            let Some(record) = plugins.get_mut(&name) else {
                continue;
            };
            record.advance(PluginState::Loading);
            let host: Arc<dyn DeviceHost> =
                Arc::new(BridgeHandle::new(name.clone(), Arc::downgrade(&self.shared)));
            let span = info_span!("plugin", name = %name);
            match self.loader.load(record, host, span) {
                Ok(handle) => loaded.push((name, handle)),
                Err(e) => record_failure(record, LifecycleStage::Load, &e),
            }
        }
        loaded
    }

    /// Give plugins whose start task vanished without a reason a failure.
    async fn settle_failures(&self, failed: &[String]) {
        let mut plugins = self.shared.plugins.lock().await;
        for name in failed {
            if let Some(record) = plugins.get_mut(name) {
                if record.failure().is_none() {
                    let err = BridgeError::PluginStart {
                        plugin: name.clone(),
                        reason: "start task ended without reporting".to_string(),
                    };
                    record_failure(record, LifecycleStage::Start, &err);
                }
            }
        }
    }

    async fn start_engine(&self) -> Result<(), BridgeError> {
        let started = &self.shared.engine_started;
        if started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        if let Err(e) = self.shared.engine.start().await {
            started.store(false, Ordering::SeqCst);
            return Err(match e {
                BridgeError::ProtocolEngine(_) => e,
                other => BridgeError::ProtocolEngine(other.to_string()),
            });
        }
        info!("protocol engine started");
        Ok(())
    }

    /// Record pairing state for every hosting endpoint.
    async fn announce_pairing(&self) {
        let shared = &self.shared;
        for hosted in shared.topology.hosted().await {
            let key = hosted.identity.storage_key.as_str();
            let owners = shared.owned_plugins(&hosted.owner).await;

            if hosted.endpoint.is_commissioned() {
                shared.set_paired(&owners, true).await;
                info!(endpoint = key, "endpoint already commissioned");
                continue;
            }

            match hosted.endpoint.pairing_code() {
                Ok(code) => {
                    let ctx = StorageContext::new(shared.store.clone(), key);
                    if let Err(e) = store_pairing(&ctx, &code).await {
                        warn!(endpoint = key, error = %e, "could not store pairing codes");
                    }
                    let rendered = render_qr(&code.qr_pairing_code).unwrap_or_else(|e| {
                        warn!(endpoint = key, error = %e, "could not render pairing QR code");
                        String::new()
                    });
                    info!(
                        endpoint = key,
                        qr = %code.qr_pairing_code,
                        manual = %code.manual_pairing_code,
                        "endpoint ready for commissioning\n{rendered}"
                    );
                }
                Err(e) => warn!(endpoint = key, error = %e, "no pairing code available"),
            }
        }
    }
}

/// Log what the bridge is running on, for bug reports.
fn log_host_info(topology: Topology) {
    let mut system = System::new();
    system.refresh_memory();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %System::host_name().unwrap_or_else(|| "unknown".to_string()),
        os = %System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
        kernel = %System::kernel_version().unwrap_or_default(),
        arch = std::env::consts::ARCH,
        cpus = std::thread::available_parallelism().map_or(1, |n| n.get()),
        memory_mib = system.total_memory() / (1024 * 1024),
        pid = std::process::id(),
        topology = %topology,
        "starting bridge"
    );
}

/// Wait until every start task has returned or been cancelled, so none of
/// them can touch a plugin record afterwards.
async fn join_drivers(drivers: &mut JoinSet<()>) {
    while let Some(joined) = drivers.join_next().await {
        if let Err(e) = joined {
            if !e.is_cancelled() {
                error!(error = %e, "plugin start task ended abnormally");
            }
        }
    }
}

/// Start one plugin and report the result to the barrier.
async fn drive_plugin(
    shared: Arc<BridgeShared>,
    name: String,
    handle: PlatformHandle,
    ticket: StartTicket,
) {
    match start_plugin(&shared, &name, &handle).await {
        Ok(()) => {
            shared.advance(&name, PluginState::Started).await;
            info!(plugin = %name, "plugin started");
            ticket.started();
        }
        Err((stage, err)) => {
            shared.fail(&name, stage, &err).await;
            ticket.failed();
        }
    }
}

async fn start_plugin(
    shared: &BridgeShared,
    name: &str,
    handle: &PlatformHandle,
) -> Result<(), (LifecycleStage, BridgeError)> {
    let topology = shared.topology.topology();
    let capability = handle.capability();

    if topology == Topology::PerPlugin && capability == CapabilityType::MultiDevice {
        shared
            .topology
            .create_plugin_endpoint(name, capability, None)
            .await
            .map_err(|e| (LifecycleStage::Endpoint, e))?;
    }

    shared.advance(name, PluginState::Starting).await;
    let reason = start_reason(topology, capability);
    debug!(plugin = name, reason, "calling on_start");
    handle
        .platform()
        .on_start(reason)
        .await
        .map_err(|e| (LifecycleStage::Start, as_start_error(name, e)))?;

    // A single device plugin's endpoint is modeled on its first device, so it
    // can only be built once the plugin registered one.
    if topology == Topology::PerPlugin && capability == CapabilityType::SingleDevice {
        let first = shared
            .devices
            .lock()
            .await
            .first_for(name)
            .map(|r| r.device.clone());
        let endpoint = shared
            .topology
            .create_plugin_endpoint(name, capability, first.as_ref())
            .await
            .map_err(|e| (LifecycleStage::Endpoint, e))?;
        shared
            .devices
            .lock()
            .await
            .attach_pending(name, endpoint.as_ref())
            .map_err(|e| (LifecycleStage::Attach, e))?;
    }
    Ok(())
}

fn as_start_error(plugin: &str, err: BridgeError) -> BridgeError {
    match err {
        BridgeError::PluginStart { .. } => err,
        other => BridgeError::PluginStart {
            plugin: plugin.to_string(),
            reason: other.to_string(),
        },
    }
}
