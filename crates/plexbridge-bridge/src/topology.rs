// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosting endpoint layout for the configured topology.
//!
//! In `single-aggregator` mode one aggregator endpoint, stored under the
//! `bridge` namespace, hosts every device. In `per-plugin` mode each plugin
//! gets its own endpoint in its own namespace: a bare endpoint for a
//! single-device plugin, an endpoint with an aggregator for a multi-device
//! plugin.
//!
//! Serial numbers and unique ids are read from the endpoint's namespace and,
//! when absent, derived from the namespace name and persisted, so a restart
//! never changes them.

use std::sync::Arc;

use plexbridge_config::IdentityConfig;
use plexbridge_core::types::{AGGREGATOR_DEVICE_TYPE, truncate_label};
use plexbridge_core::{
    AggregatorIdentity, BasicInformation, BridgeError, CapabilityType, Device, Endpoint,
    EndpointIdentity, EndpointKind, EventSender, KeyValueStore, ProtocolEngine, StorageContext,
    Topology,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Namespace of the shared endpoint and the plugin registry.
pub const BRIDGE_NAMESPACE: &str = "bridge";

/// Product name of per-plugin aggregators.
pub const DYNAMIC_PLATFORM_PRODUCT: &str = "Dynamic Platform";

const COMMISSIONING_PREFIX: &str = "CS";
const AGGREGATOR_PREFIX: &str = "AG";

/// Who an endpoint hosts devices for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointOwner {
    /// The single aggregator shared by all plugins.
    Shared,
    Plugin(String),
}

/// An endpoint built by the engine, with the identity it was built from.
#[derive(Clone)]
pub struct HostedEndpoint {
    pub owner: EndpointOwner,
    /// The identity the endpoint was created with; `storage_key` names its
    /// namespace.
    pub identity: EndpointIdentity,
    pub endpoint: Arc<dyn Endpoint>,
}

/// Deterministic id for `field` of the endpoint stored in `namespace`.
pub fn stable_id(prefix: &str, namespace: &str, field: &str) -> String {
    let digest = Sha256::digest(format!("plexbridge/{namespace}/{field}").as_bytes());
    let hex = hex::encode(digest);
    format!("{prefix}{}", &hex[..16])
}

/// Creates hosting endpoints and answers which endpoint hosts whom.
pub struct TopologyController {
    topology: Topology,
    identity: IdentityConfig,
    engine: Arc<dyn ProtocolEngine>,
    store: Arc<dyn KeyValueStore>,
    events: EventSender,
    endpoints: RwLock<Vec<HostedEndpoint>>,
}

impl TopologyController {
    /// A controller with no endpoints yet. Endpoints it creates report their
    /// session and commissioning changes on `events`.
    pub fn new(
        topology: Topology,
        identity: IdentityConfig,
        engine: Arc<dyn ProtocolEngine>,
        store: Arc<dyn KeyValueStore>,
        events: EventSender,
    ) -> Self {
        Self {
            topology,
            identity,
            engine,
            store,
            events,
            endpoints: RwLock::new(Vec::new()),
        }
    }

    /// The topology endpoints are laid out for.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Create the shared aggregator endpoint. Idempotent.
    pub async fn prepare_shared(&self) -> Result<Arc<dyn Endpoint>, BridgeError> {
        if self.topology != Topology::SingleAggregator {
            return Err(BridgeError::Internal(
                "the shared aggregator only exists in single-aggregator mode".to_string(),
            ));
        }
        if let Some(existing) = self.find(&EndpointOwner::Shared).await {
            return Ok(existing.endpoint);
        }

        let template = IdentityTemplate {
            kind: EndpointKind::Aggregator,
            device_name: self.identity.product_name.clone(),
            device_type: AGGREGATOR_DEVICE_TYPE,
            vendor_id: self.identity.vendor_id,
            vendor_name: self.identity.vendor_name.clone(),
            product_id: self.identity.product_id,
            product_name: self.identity.product_name.clone(),
            basic: None,
        };
        let identity = self.resolve_identity(BRIDGE_NAMESPACE, template).await?;
        let endpoint = self
            .engine
            .create_endpoint(&identity, self.events.clone())
            .await
            .map_err(|e| BridgeError::EndpointCreation {
                plugin: BRIDGE_NAMESPACE.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            serial = %identity.serial_number,
            unique_id = %identity.unique_id,
            "shared aggregator endpoint created"
        );
        self.insert(EndpointOwner::Shared, identity, endpoint.clone())
            .await;
        Ok(endpoint)
    }

    /// Create the endpoint of `plugin` in per-plugin mode. Idempotent.
    ///
    /// A single-device plugin's endpoint takes its identity from
    /// `first_device`, which must carry basic information.
    pub async fn create_plugin_endpoint(
        &self,
        plugin: &str,
        capability: CapabilityType,
        first_device: Option<&Device>,
    ) -> Result<Arc<dyn Endpoint>, BridgeError> {
        if self.topology != Topology::PerPlugin {
            return Err(BridgeError::Internal(format!(
                "plugin endpoint for {plugin} requested in single-aggregator mode"
            )));
        }
        let endpoint_error = |reason: String| BridgeError::EndpointCreation {
            plugin: plugin.to_string(),
            reason,
        };
        if plugin == BRIDGE_NAMESPACE {
            return Err(endpoint_error(format!(
                "plugin name `{plugin}` is reserved for the shared aggregator"
            )));
        }

        let owner = EndpointOwner::Plugin(plugin.to_string());
        if let Some(existing) = self.find(&owner).await {
            return Ok(existing.endpoint);
        }

        let template = match capability {
            CapabilityType::MultiDevice => IdentityTemplate {
                kind: EndpointKind::Aggregator,
                device_name: plugin.to_string(),
                device_type: AGGREGATOR_DEVICE_TYPE,
                vendor_id: self.identity.vendor_id,
                vendor_name: self.identity.vendor_name.clone(),
                product_id: self.identity.product_id,
                product_name: DYNAMIC_PLATFORM_PRODUCT.to_string(),
                basic: None,
            },
            CapabilityType::SingleDevice => {
                let device = first_device
                    .ok_or_else(|| endpoint_error("the plugin registered no device".to_string()))?;
                let basic = device.basic.clone().ok_or_else(|| {
                    endpoint_error(format!("device {} has no basic information", device.id))
                })?;
                IdentityTemplate {
                    kind: EndpointKind::Bare,
                    device_name: device.name.clone(),
                    device_type: device.device_type,
                    vendor_id: basic.vendor_id,
                    vendor_name: basic.vendor_name.clone(),
                    product_id: basic.product_id,
                    product_name: basic.product_name.clone(),
                    basic: Some(basic),
                }
            }
        };

        let identity = self.resolve_identity(plugin, template).await?;
        let endpoint = self
            .engine
            .create_endpoint(&identity, self.events.clone())
            .await
            .map_err(|e| endpoint_error(e.to_string()))?;

        info!(
            plugin,
            kind = %identity.kind,
            serial = %identity.serial_number,
            "plugin endpoint created"
        );
        self.insert(owner, identity, endpoint.clone()).await;
        Ok(endpoint)
    }

    /// The endpoint hosting `plugin`'s devices, if it exists yet.
    pub async fn endpoint_for(&self, plugin: &str) -> Option<Arc<dyn Endpoint>> {
        let owner = match self.topology {
            Topology::SingleAggregator => EndpointOwner::Shared,
            Topology::PerPlugin => EndpointOwner::Plugin(plugin.to_string()),
        };
        self.find(&owner).await.map(|h| h.endpoint)
    }

    /// Owner of the endpoint stored under `storage_key`.
    pub async fn owner_of(&self, storage_key: &str) -> Option<EndpointOwner> {
        self.endpoints
            .read()
            .await
            .iter()
            .find(|h| h.identity.storage_key == storage_key)
            .map(|h| h.owner.clone())
    }

    /// The endpoint stored under `storage_key`.
    pub async fn endpoint_by_key(&self, storage_key: &str) -> Option<Arc<dyn Endpoint>> {
        self.endpoints
            .read()
            .await
            .iter()
            .find(|h| h.identity.storage_key == storage_key)
            .map(|h| h.endpoint.clone())
    }

    /// Every endpoint created so far, in creation order.
    pub async fn hosted(&self) -> Vec<HostedEndpoint> {
        self.endpoints.read().await.clone()
    }

    async fn find(&self, owner: &EndpointOwner) -> Option<HostedEndpoint> {
        self.endpoints
            .read()
            .await
            .iter()
            .find(|h| &h.owner == owner)
            .cloned()
    }

    async fn insert(
        &self,
        owner: EndpointOwner,
        identity: EndpointIdentity,
        endpoint: Arc<dyn Endpoint>,
    ) {
        self.endpoints.write().await.push(HostedEndpoint {
            owner,
            identity,
            endpoint,
        });
    }

    /// Build the identity of the endpoint stored in `namespace`.
    ///
    /// Descriptive fields are rewritten on every start; ids and versions are
    /// kept once stored.
    async fn resolve_identity(
        &self,
        namespace: &str,
        template: IdentityTemplate,
    ) -> Result<EndpointIdentity, BridgeError> {
        let ctx = StorageContext::new(self.store.clone(), namespace);
        let basic = template.basic.as_ref();

        let device_name = truncate_label(&template.device_name);
        let vendor_name = truncate_label(&template.vendor_name);
        let product_name = truncate_label(&template.product_name);

        ctx.set("deviceName", &device_name).await?;
        ctx.set("deviceType", &template.device_type).await?;
        ctx.set("vendorId", &template.vendor_id).await?;
        ctx.set("vendorName", &vendor_name).await?;
        ctx.set("productId", &template.product_id).await?;
        ctx.set("productName", &product_name).await?;

        let serial_number = stored_or_derived(
            &ctx,
            "serialNumber",
            basic.and_then(|b| b.serial_number.clone()),
            stable_id(COMMISSIONING_PREFIX, namespace, "serialNumber"),
        )
        .await?;
        let unique_id = stored_or_derived(
            &ctx,
            "uniqueId",
            basic.and_then(|b| b.unique_id.clone()),
            stable_id(COMMISSIONING_PREFIX, namespace, "uniqueId"),
        )
        .await?;

        let software_version = stored_or_derived(
            &ctx,
            "softwareVersion",
            basic.and_then(|b| b.software_version),
            1,
        )
        .await?;
        let software_version_string = stored_or_derived(
            &ctx,
            "softwareVersionString",
            basic.and_then(|b| b.software_version_string.clone()),
            "1.0.0".to_string(),
        )
        .await?;
        let hardware_version = stored_or_derived(
            &ctx,
            "hardwareVersion",
            basic.and_then(|b| b.hardware_version),
            1,
        )
        .await?;
        let hardware_version_string = stored_or_derived(
            &ctx,
            "hardwareVersionString",
            basic.and_then(|b| b.hardware_version_string.clone()),
            "1.0.0".to_string(),
        )
        .await?;

        let aggregator = match template.kind {
            EndpointKind::Aggregator => Some(AggregatorIdentity {
                serial_number: stored_or_derived(
                    &ctx,
                    "aggregatorSerialNumber",
                    None,
                    stable_id(AGGREGATOR_PREFIX, namespace, "aggregatorSerialNumber"),
                )
                .await?,
                unique_id: stored_or_derived(
                    &ctx,
                    "aggregatorUniqueId",
                    None,
                    stable_id(AGGREGATOR_PREFIX, namespace, "aggregatorUniqueId"),
                )
                .await?,
            }),
            EndpointKind::Bare => None,
        };

        debug!(namespace, serial = %serial_number, "endpoint identity resolved");
        Ok(EndpointIdentity {
            storage_key: namespace.to_string(),
            kind: template.kind,
            device_name,
            device_type: template.device_type,
            vendor_id: template.vendor_id,
            vendor_name,
            product_id: template.product_id,
            product_name,
            serial_number,
            unique_id,
            software_version,
            software_version_string,
            hardware_version,
            hardware_version_string,
            aggregator,
        })
    }
}

struct IdentityTemplate {
    kind: EndpointKind,
    device_name: String,
    device_type: u32,
    vendor_id: u16,
    vendor_name: String,
    product_id: u16,
    product_name: String,
    basic: Option<BasicInformation>,
}

/// Stored value of `key`, else `preferred`, else `fallback`; persisted when
/// it was not stored yet.
async fn stored_or_derived<T>(
    ctx: &StorageContext,
    key: &str,
    preferred: Option<T>,
    fallback: T,
) -> Result<T, BridgeError>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    if let Some(stored) = ctx.get::<T>(key).await? {
        return Ok(stored);
    }
    let value = preferred.unwrap_or(fallback);
    ctx.set(key, &value).await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexbridge_test_utils::{MemoryStore, MockEngine, fixtures};
    use tokio::sync::mpsc;

    fn controller(
        topology: Topology,
        store: Arc<MemoryStore>,
    ) -> (TopologyController, Arc<MockEngine>) {
        let engine = Arc::new(MockEngine::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let controller = TopologyController::new(
            topology,
            IdentityConfig::default(),
            engine.clone(),
            store,
            tx,
        );
        (controller, engine)
    }

    #[test]
    fn stable_ids_are_deterministic_per_namespace() {
        let a = stable_id("CS", "hue", "serialNumber");
        assert_eq!(a, stable_id("CS", "hue", "serialNumber"));
        assert_ne!(a, stable_id("CS", "shelly", "serialNumber"));
        assert!(a.starts_with("CS"));
        assert_eq!(a.len(), 18);
    }

    #[tokio::test]
    async fn shared_endpoint_is_created_once() {
        let store = Arc::new(MemoryStore::new());
        let (controller, engine) = controller(Topology::SingleAggregator, store);
        controller.prepare_shared().await.unwrap();
        controller.prepare_shared().await.unwrap();

        assert_eq!(engine.endpoints().len(), 1);
        let identity = engine.endpoints()[0].identity().clone();
        assert_eq!(identity.storage_key, BRIDGE_NAMESPACE);
        assert_eq!(identity.kind, EndpointKind::Aggregator);
        assert!(identity.aggregator.is_some());
        assert!(controller.endpoint_for("any-plugin").await.is_some());
        assert_eq!(
            controller.owner_of(BRIDGE_NAMESPACE).await,
            Some(EndpointOwner::Shared)
        );
    }

    #[tokio::test]
    async fn identities_survive_restart() {
        let store = Arc::new(MemoryStore::new());
        let (first, first_engine) = controller(Topology::PerPlugin, store.clone());
        first
            .create_plugin_endpoint("hue", CapabilityType::MultiDevice, None)
            .await
            .unwrap();
        let before = first_engine.endpoints()[0].identity().clone();

        let (second, second_engine) = controller(Topology::PerPlugin, store);
        second
            .create_plugin_endpoint("hue", CapabilityType::MultiDevice, None)
            .await
            .unwrap();
        let after = second_engine.endpoints()[0].identity().clone();

        assert_eq!(before, after);
        assert_eq!(after.product_name, DYNAMIC_PLATFORM_PRODUCT);
        assert!(after.aggregator.unwrap().serial_number.starts_with("AG"));
    }

    #[tokio::test]
    async fn single_device_endpoint_uses_device_identity() {
        let store = Arc::new(MemoryStore::new());
        let (controller, engine) = controller(Topology::PerPlugin, store.clone());
        let lamp = fixtures::light("lamp");
        controller
            .create_plugin_endpoint("lamp-plugin", CapabilityType::SingleDevice, Some(&lamp))
            .await
            .unwrap();

        let identity = engine.endpoints()[0].identity().clone();
        assert_eq!(identity.kind, EndpointKind::Bare);
        assert_eq!(identity.vendor_name, "Acme");
        assert_eq!(identity.serial_number, "SN-lamp");
        assert_eq!(identity.software_version, 3);
        assert!(identity.aggregator.is_none());
        assert!(store.keys("lamp-plugin").await.contains(&"uniqueId".to_string()));
    }

    #[tokio::test]
    async fn single_device_endpoint_needs_basic_information() {
        let store = Arc::new(MemoryStore::new());
        let (controller, engine) = controller(Topology::PerPlugin, store);

        let err = controller
            .create_plugin_endpoint("doorbell", CapabilityType::SingleDevice, None)
            .await
            .err()
            .expect("endpoint without a device");
        assert!(matches!(err, BridgeError::EndpointCreation { .. }));

        let bare = fixtures::bare_light("bell");
        let err = controller
            .create_plugin_endpoint("doorbell", CapabilityType::SingleDevice, Some(&bare))
            .await
            .err()
            .expect("endpoint without basic information");
        assert!(err.to_string().contains("no basic information"));
        assert!(engine.endpoints().is_empty());
        assert!(controller.endpoint_for("doorbell").await.is_none());
    }

    #[tokio::test]
    async fn plugin_cannot_claim_the_shared_identity() {
        let store = Arc::new(MemoryStore::new());
        let (shared, shared_engine) = controller(Topology::SingleAggregator, store.clone());
        shared.prepare_shared().await.unwrap();
        let aggregator = shared_engine.endpoints()[0].identity().clone();

        let (per_plugin, engine) = controller(Topology::PerPlugin, store.clone());
        let err = per_plugin
            .create_plugin_endpoint(BRIDGE_NAMESPACE, CapabilityType::MultiDevice, None)
            .await
            .err()
            .expect("reserved plugin name");
        assert!(matches!(err, BridgeError::EndpointCreation { .. }));
        assert!(err.to_string().contains("reserved"));
        assert!(engine.endpoints().is_empty());

        let ctx = StorageContext::new(store, BRIDGE_NAMESPACE);
        assert_eq!(
            ctx.get::<String>("serialNumber").await.unwrap(),
            Some(aggregator.serial_number)
        );
        assert_eq!(
            ctx.get::<String>("productName").await.unwrap(),
            Some(aggregator.product_name)
        );
    }

    #[tokio::test]
    async fn long_names_are_truncated() {
        let store = Arc::new(MemoryStore::new());
        let (controller, engine) = controller(Topology::PerPlugin, store);
        let name = "a-plugin-name-that-is-far-longer-than-thirty-two";
        controller
            .create_plugin_endpoint(name, CapabilityType::MultiDevice, None)
            .await
            .unwrap();
        let identity = engine.endpoints()[0].identity().clone();
        assert_eq!(identity.device_name.len(), 32);
        assert_eq!(identity.storage_key, name);
    }
}
