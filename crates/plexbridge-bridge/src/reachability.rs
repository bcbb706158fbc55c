// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reacts to engine notifications and tears the bridge down.
//!
//! A ready controller session on an endpoint moves every plugin hosted there
//! from `awaiting-connection` to `connected` exactly once. After the settle
//! delay the plugin's deferred devices are attached and every one of its
//! devices is published as reachable.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use plexbridge_core::{
    BridgeError, EngineEvent, FabricIndex, LifecycleStage, Platform, PluginState, SessionInfo,
};
use tracing::{debug, error, info, warn};

use crate::shared::BridgeShared;

/// Applies connection and commissioning changes to plugin state.
#[derive(Clone)]
pub struct ReachabilityPropagator {
    shared: Arc<BridgeShared>,
}

impl ReachabilityPropagator {
    pub(crate) fn new(shared: Arc<BridgeShared>) -> Self {
        Self { shared }
    }

    /// Apply one engine notification.
    pub async fn handle(&self, event: EngineEvent) {
        match event {
            EngineEvent::SessionsChanged {
                endpoint,
                fabric,
                sessions,
            } => {
                let ready = sessions
                    .first()
                    .is_some_and(SessionInfo::is_controller_ready);
                if !ready {
                    debug!(endpoint = %endpoint, fabric = %fabric, "session change without a ready controller");
                    return;
                }
                self.controller_ready(&endpoint, fabric).await;
            }
            EngineEvent::CommissioningChanged {
                endpoint,
                fabric,
                fabrics,
            } => self.commissioning_changed(&endpoint, fabric, fabrics).await,
        }
    }

    async fn controller_ready(&self, storage_key: &str, fabric: FabricIndex) {
        let Some(owner) = self.shared.topology.owner_of(storage_key).await else {
            warn!(endpoint = storage_key, "session event for an unknown endpoint");
            return;
        };

        let mut changed = false;
        for plugin in self.shared.owned_plugins(&owner).await {
            changed |= self.connect(&plugin).await;
        }
        if !changed {
            return;
        }

        info!(endpoint = storage_key, fabric = %fabric, "controller connected");
        if let Some(endpoint) = self.shared.topology.endpoint_by_key(storage_key).await {
            endpoint.set_reachable(true);
        }
    }

    /// Move `plugin` to `connected` and schedule its device exposure.
    ///
    /// Returns `false` when the plugin was not awaiting a connection,
    /// including when it is already connected.
    pub async fn connect(&self, plugin: &str) -> bool {
        {
            let mut plugins = self.shared.plugins.lock().await;
            let Some(record) = plugins.get_mut(plugin) else {
                return false;
            };
            if record.state() != PluginState::AwaitingConnection {
                debug!(plugin, state = %record.state(), "connect ignored");
                return false;
            }
            record.advance(PluginState::Connected);
            record.paired = true;
        }
        info!(plugin, "plugin connected");

        let shared = self.shared.clone();
        let plugin = plugin.to_string();
        let settle = shared.lifecycle.connect_settle();
        let token = shared.deferred.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(settle) => {}
            }
            match shared.expose_devices(&plugin).await {
                Ok(attached) if !attached.is_empty() => {
                    info!(plugin = %plugin, count = attached.len(), "deferred devices attached");
                }
                Ok(_) => {}
                Err(e) => shared.fail(&plugin, LifecycleStage::Attach, &e).await,
            }
        });
        true
    }

    async fn commissioning_changed(&self, storage_key: &str, fabric: FabricIndex, fabrics: usize) {
        let Some(owner) = self.shared.topology.owner_of(storage_key).await else {
            warn!(endpoint = storage_key, "commissioning event for an unknown endpoint");
            return;
        };
        let plugins = self.shared.owned_plugins(&owner).await;

        if fabrics == 0 {
            warn!(
                endpoint = storage_key,
                fabric = %fabric,
                "last controller removed; endpoint must be commissioned again"
            );
            self.shared.set_paired(&plugins, false).await;
        } else {
            info!(endpoint = storage_key, fabric = %fabric, fabrics, "commissioning changed");
            self.shared.set_paired(&plugins, true).await;
        }
    }

    /// Shut every loaded plugin down, then the engine, then storage.
    ///
    /// Plugins get `shutdown_grace` in total; after that the engine is
    /// stopped regardless. Runs at most once; later calls return `Ok`.
    pub async fn shutdown(&self, reason: &str) -> Result<(), BridgeError> {
        if self.shared.shutdown_started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.deferred.cancel();

        let platforms: Vec<(String, Arc<dyn Platform>)> = self
            .shared
            .plugins
            .lock()
            .await
            .list()
            .iter()
            .filter_map(|r| r.platform().map(|h| (r.name.clone(), h.platform().clone())))
            .collect();

        info!(count = platforms.len(), reason, "shutting down plugins");
        let grace = self.shared.lifecycle.shutdown_grace();
        let calls = platforms.iter().map(|(name, platform)| async move {
            if let Err(e) = platform.on_shutdown(reason).await {
                warn!(plugin = %name, error = %e, "plugin shutdown failed");
            }
        });
        if tokio::time::timeout(grace, futures::future::join_all(calls))
            .await
            .is_err()
        {
            warn!(grace = ?grace, "shutdown grace elapsed, forcing teardown");
        }

        let mut first_error = None;
        if self.shared.engine_started.load(Ordering::SeqCst) {
            if let Err(e) = self.shared.engine.stop().await {
                error!(error = %e, "protocol engine stop failed");
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.shared.store.close().await {
            error!(error = %e, "storage close failed");
            first_error.get_or_insert(e);
        }

        info!("bridge stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
