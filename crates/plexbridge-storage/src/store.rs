// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`KeyValueStore`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use plexbridge_core::{BridgeError, KeyValueStore};
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::database::{Database, map_tr_err};

/// Key/value store backed by the `kv_store` table.
///
/// Values are stored as JSON text. After [`close`](KeyValueStore::close)
/// every operation fails with a storage error.
pub struct SqliteStore {
    db: Database,
    closed: AtomicBool,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            closed: AtomicBool::new(false),
        }
    }

    /// Open the database at `path` and wrap it.
    pub async fn open(path: &str) -> Result<Self, BridgeError> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self, BridgeError> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    fn ensure_open(&self) -> Result<(), BridgeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::Storage {
                source: "store is closed".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, BridgeError> {
        self.ensure_open()?;
        let namespace = namespace.to_string();
        let key = key.to_string();
        let raw: Option<String> = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                    rusqlite::params![namespace, key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| BridgeError::Storage {
                source: Box::new(e),
            })
        })
        .transpose()
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), BridgeError> {
        self.ensure_open()?;
        let namespace = namespace.to_string();
        let key = key.to_string();
        let text = value.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv_store (namespace, key, value) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, \
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    rusqlite::params![namespace, key, text],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), BridgeError> {
        self.ensure_open()?;
        let namespace = namespace.to_string();
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM kv_store WHERE namespace = ?1 AND key = ?2",
                    rusqlite::params![namespace, key],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn close(&self) -> Result<(), BridgeError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("store already closed");
            return Ok(());
        }
        self.db.close().await
    }
}
