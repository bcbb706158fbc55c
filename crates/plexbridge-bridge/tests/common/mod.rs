// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared harness for bridge integration tests.
//!
//! Installs mock plugins into a temp directory, registers them, and runs a
//! [`Bridge`] against a [`MockEngine`] and a [`MemoryStore`]. Tests run with
//! paused time, so sleeping in the test advances the clock once every task
//! is idle.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use plexbridge_bridge::{BRIDGE_NAMESPACE, Bridge, BridgeSnapshot};
use plexbridge_config::PlexbridgeConfig;
use plexbridge_core::{BridgeError, StorageContext, Topology};
use plexbridge_plugin::{PluginLoader, PluginRegistry};
use plexbridge_test_utils::{MemoryStore, MockEngine, MockPlugin};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TestBridgeBuilder {
    config: PlexbridgeConfig,
    plugins: Vec<MockPlugin>,
    disabled: Vec<String>,
    unregistered: Vec<String>,
    store: Option<Arc<MemoryStore>>,
}

impl TestBridgeBuilder {
    pub fn plugin(mut self, plugin: &MockPlugin) -> Self {
        self.plugins.push(plugin.clone());
        self
    }

    /// Register `plugin` but disable it before the bridge starts.
    pub fn disabled(mut self, plugin: &MockPlugin) -> Self {
        self.disabled.push(plugin.name().to_string());
        self.plugin(plugin)
    }

    /// Register `plugin` without giving the loader its factory.
    pub fn without_factory(mut self, plugin: &MockPlugin) -> Self {
        self.unregistered.push(plugin.name().to_string());
        self.plugin(plugin)
    }

    pub fn store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut PlexbridgeConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub async fn build(self) -> TestBridge {
        let dir = TempDir::new().unwrap();
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let engine = Arc::new(MockEngine::new());

        let mut registry = PluginRegistry::open(StorageContext::new(store.clone(), BRIDGE_NAMESPACE))
            .await
            .unwrap();
        let mut loader = PluginLoader::new();
        for plugin in &self.plugins {
            if registry.get(plugin.name()).is_none() {
                let path = plugin.install(dir.path()).unwrap();
                registry.add(&path).await.unwrap();
            }
            if !self.unregistered.iter().any(|n| n == plugin.name()) {
                loader.register(plugin.name(), plugin.factory());
            }
        }
        for name in &self.disabled {
            registry.set_enabled(name, false).await.unwrap();
        }

        let bridge = Bridge::new(&self.config, registry, loader, engine.clone(), store.clone());
        TestBridge {
            bridge,
            engine,
            store,
            cancel: CancellationToken::new(),
            run: None,
            _dir: dir,
        }
    }

    /// Build, run, and wait for the engine to start.
    pub async fn start(self) -> TestBridge {
        let mut bridge = self.build().await;
        bridge.spawn();
        bridge.wait_running().await;
        bridge
    }
}

pub struct TestBridge {
    pub bridge: Bridge,
    pub engine: Arc<MockEngine>,
    pub store: Arc<MemoryStore>,
    pub cancel: CancellationToken,
    run: Option<JoinHandle<Result<(), BridgeError>>>,
    _dir: TempDir,
}

impl TestBridge {
    pub fn builder(topology: Topology) -> TestBridgeBuilder {
        let mut config = PlexbridgeConfig::default();
        config.bridge.mode = topology;
        TestBridgeBuilder {
            config,
            plugins: Vec::new(),
            disabled: Vec::new(),
            unregistered: Vec::new(),
            store: None,
        }
    }

    /// Run the bridge in the background.
    pub fn spawn(&mut self) {
        let bridge = self.bridge.clone();
        let cancel = self.cancel.clone();
        self.run = Some(tokio::spawn(async move { bridge.run(cancel).await }));
    }

    /// Wait until the engine started and the startup sequence finished.
    pub async fn wait_running(&self) {
        self.engine.wait_started().await;
        // Paused time only advances once the bridge task is idle again.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Wait for `run` to return on its own.
    pub async fn join(&mut self) -> Result<(), BridgeError> {
        let handle = self.run.take().expect("bridge was not spawned");
        handle.await.expect("bridge task panicked")
    }

    /// Cancel the bridge and wait for its shutdown.
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        self.cancel.cancel();
        self.join().await
    }

    pub async fn snapshot(&self) -> BridgeSnapshot {
        self.bridge.snapshot().await
    }
}

/// Let every pending task and timer (including the connect settle delay) run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}
