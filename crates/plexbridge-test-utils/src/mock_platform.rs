// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable plugin platforms.
//!
//! A [`MockPlugin`] describes a plugin (name, capability, devices it
//! registers during `on_start`, how its start behaves), writes its
//! `plugin.toml`, and provides the factory the loader calls. The
//! [`PlatformRecorder`] it shares with the created platform lets tests observe
//! calls and register more devices later.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use plexbridge_core::{BridgeError, CapabilityType, Device, DeviceHost, DeviceKind, Platform};
use plexbridge_plugin::PlatformFactory;
use tracing::{Span, info};

/// How a mock platform's `on_start` resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartBehavior {
    Succeed,
    Fail(String),
    /// Never resolves.
    Hang,
}

/// Observations shared between a [`MockPlugin`] and the platform it built.
#[derive(Default)]
pub struct PlatformRecorder {
    start_calls: AtomicUsize,
    finished_starts: AtomicUsize,
    shutdown_calls: AtomicUsize,
    start_reasons: Mutex<Vec<String>>,
    host: OnceLock<Arc<dyn DeviceHost>>,
}

impl PlatformRecorder {
    pub fn start_count(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `on_start` calls that ran to completion.
    pub fn finished_start_count(&self) -> usize {
        self.finished_starts.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    pub fn start_reasons(&self) -> Vec<String> {
        self.start_reasons
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// The host the factory received, once the plugin is loaded.
    pub fn host(&self) -> Option<Arc<dyn DeviceHost>> {
        self.host.get().cloned()
    }
}

/// Description of a mock plugin.
#[derive(Clone)]
pub struct MockPlugin {
    name: String,
    capability: CapabilityType,
    reported_capability: CapabilityType,
    devices: Vec<(Device, DeviceKind)>,
    start: StartBehavior,
    start_delay: Duration,
    shutdown_delay: Duration,
    recorder: Arc<PlatformRecorder>,
}

impl MockPlugin {
    pub fn new(name: impl Into<String>, capability: CapabilityType) -> Self {
        Self {
            name: name.into(),
            capability,
            reported_capability: capability,
            devices: Vec::new(),
            start: StartBehavior::Succeed,
            start_delay: Duration::ZERO,
            shutdown_delay: Duration::ZERO,
            recorder: Arc::new(PlatformRecorder::default()),
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityType::SingleDevice)
    }

    pub fn multi(name: impl Into<String>) -> Self {
        Self::new(name, CapabilityType::MultiDevice)
    }

    /// Register `device` through `add_device` during `on_start`.
    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push((device, DeviceKind::Standalone));
        self
    }

    /// Register `device` through `add_bridged_device` during `on_start`.
    pub fn with_bridged_device(mut self, device: Device) -> Self {
        self.devices.push((device, DeviceKind::Bridged));
        self
    }

    pub fn start_behavior(mut self, behavior: StartBehavior) -> Self {
        self.start = behavior;
        self
    }

    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    /// Have the platform report a capability other than the manifest's.
    pub fn reporting(mut self, capability: CapabilityType) -> Self {
        self.reported_capability = capability;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recorder(&self) -> Arc<PlatformRecorder> {
        self.recorder.clone()
    }

    /// The `plugin.toml` content for this plugin (entry = name).
    pub fn manifest_toml(&self) -> String {
        format!(
            "[plugin]\nname = \"{}\"\nversion = \"1.0.0\"\ndescription = \"mock {}\"\nauthor = \"tests\"\ncapability_type = \"{}\"\nentry = \"{}\"\n",
            self.name, self.name, self.capability, self.name
        )
    }

    /// Write `<root>/<name>/plugin.toml` and return the plugin directory.
    pub fn install(&self, root: &Path) -> std::io::Result<PathBuf> {
        let dir = root.join(&self.name);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("plugin.toml"), self.manifest_toml())?;
        Ok(dir)
    }

    /// Factory building this plugin's platform.
    pub fn factory(&self) -> impl PlatformFactory + 'static {
        let template = self.clone();
        move |host: Arc<dyn DeviceHost>, span: Span| -> Result<Box<dyn Platform>, BridgeError> {
            let _ = template.recorder.host.set(host.clone());
            Ok(Box::new(MockPlatform {
                template: template.clone(),
                host,
                span,
            }))
        }
    }
}

/// The platform a [`MockPlugin`] factory builds.
pub struct MockPlatform {
    template: MockPlugin,
    host: Arc<dyn DeviceHost>,
    span: Span,
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.template.name
    }

    fn capability(&self) -> CapabilityType {
        self.template.reported_capability
    }

    async fn on_start(&self, reason: &str) -> Result<(), BridgeError> {
        let recorder = &self.template.recorder;
        recorder.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut reasons) = recorder.start_reasons.lock() {
            reasons.push(reason.to_string());
        }
        self.span.in_scope(|| info!(reason, "mock platform starting"));

        if !self.template.start_delay.is_zero() {
            tokio::time::sleep(self.template.start_delay).await;
        }

        for (device, kind) in &self.template.devices {
            match kind {
                DeviceKind::Standalone => self.host.add_device(device.clone()).await?,
                DeviceKind::Bridged => self.host.add_bridged_device(device.clone()).await?,
            }
        }

        match &self.template.start {
            StartBehavior::Succeed => {
                recorder.finished_starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            StartBehavior::Fail(message) => {
                recorder.finished_starts.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::PluginStart {
                    plugin: self.template.name.clone(),
                    reason: message.clone(),
                })
            }
            StartBehavior::Hang => std::future::pending().await,
        }
    }

    async fn on_shutdown(&self, _reason: &str) -> Result<(), BridgeError> {
        if !self.template.shutdown_delay.is_zero() {
            tokio::time::sleep(self.template.shutdown_delay).await;
        }
        self.template.recorder.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
