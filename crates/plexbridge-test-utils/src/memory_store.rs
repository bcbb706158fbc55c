// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key/value store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use plexbridge_core::{BridgeError, KeyValueStore};
use tokio::sync::Mutex;

/// A [`KeyValueStore`] backed by a map, with a close counter for assertions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<(String, String), serde_json::Value>>,
    close_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `close()` was called.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Every key stored in `namespace`, sorted.
    pub async fn keys(&self, namespace: &str) -> Vec<String> {
        let values = self.values.lock().await;
        let mut keys: Vec<String> = values
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
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
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
