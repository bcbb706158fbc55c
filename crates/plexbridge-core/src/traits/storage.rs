// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator: a namespaced JSON key/value store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::BridgeError;

/// Key/value persistence, scoped by namespace.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read a value, `None` when absent.
    async fn get(&self, namespace: &str, key: &str)
    -> Result<Option<serde_json::Value>, BridgeError>;

    /// Insert or replace a value.
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), BridgeError>;

    /// Delete a value. Deleting an absent key is not an error.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), BridgeError>;

    /// Flush and release the backend.
    async fn close(&self) -> Result<(), BridgeError>;
}

/// A [`KeyValueStore`] bound to one namespace, with typed accessors.
#[derive(Clone)]
pub struct StorageContext {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl StorageContext {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read and decode a value, `None` when absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BridgeError> {
        match self.store.get(&self.namespace, key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| BridgeError::Storage {
                    source: Box::new(e),
                }),
            None => Ok(None),
        }
    }

    /// Read a value, falling back to `default` when absent.
    pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, BridgeError> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Encode and store a value.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), BridgeError> {
        let value = serde_json::to_value(value).map_err(|e| BridgeError::Storage {
            source: Box::new(e),
        })?;
        self.store.set(&self.namespace, key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), BridgeError> {
        self.store.remove(&self.namespace, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<(String, String), serde_json::Value>>,
    }

    #[async_trait]
    impl KeyValueStore for MapStore {
        async fn get(
            &self,
            namespace: &str,
            key: &str,
        ) -> Result<Option<serde_json::Value>, BridgeError> {
            let values = self.values.lock().await;
            Ok(values.get(&(namespace.to_string(), key.to_string())).cloned())
        }

        async fn set(
            &self,
            namespace: &str,
            key: &str,
            value: serde_json::Value,
        ) -> Result<(), BridgeError> {
            self.values
                .lock()
                .await
                .insert((namespace.to_string(), key.to_string()), value);
            Ok(())
        }

        async fn remove(&self, namespace: &str, key: &str) -> Result<(), BridgeError> {
            self.values
                .lock()
                .await
                .remove(&(namespace.to_string(), key.to_string()));
            Ok(())
        }

        async fn close(&self) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MapStore::default());
        let hue = StorageContext::new(store.clone(), "hue");
        let shelly = StorageContext::new(store, "shelly");

        hue.set("serialNumber", "CS01").await.unwrap();
        assert_eq!(hue.get::<String>("serialNumber").await.unwrap().as_deref(), Some("CS01"));
        assert!(shelly.get::<String>("serialNumber").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_or_falls_back_to_default() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MapStore::default());
        let ctx = StorageContext::new(store, "bridge");
        assert_eq!(ctx.get_or("softwareVersion", 1u32).await.unwrap(), 1);
        ctx.set("softwareVersion", &7u32).await.unwrap();
        assert_eq!(ctx.get_or("softwareVersion", 1u32).await.unwrap(), 7);
        ctx.remove("softwareVersion").await.unwrap();
        assert_eq!(ctx.get_or("softwareVersion", 1u32).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn undecodable_value_is_a_storage_error() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MapStore::default());
        let ctx = StorageContext::new(store, "bridge");
        ctx.set("vendorId", "not-a-number").await.unwrap();
        let err = ctx.get::<u16>("vendorId").await.unwrap_err();
        assert!(matches!(err, BridgeError::Storage { .. }));
    }
}
