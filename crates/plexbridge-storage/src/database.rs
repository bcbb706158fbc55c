// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, and close.
//!
//! All statements run on tokio-rusqlite's single background thread.

use std::path::Path;

use plexbridge_core::BridgeError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// An open, migrated SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, BridgeError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| BridgeError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| BridgeError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn).await
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, BridgeError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| BridgeError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, BridgeError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<BridgeError>| BridgeError::Storage {
                source: Box::new(e),
            })?;

        debug!("database opened and migrated");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the background connection.
    pub async fn close(&self) -> Result<(), BridgeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.clone().close().await.map_err(map_tr_err)?;
        debug!("WAL checkpoint complete, database closed");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into [`BridgeError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BridgeError {
    BridgeError::Storage {
        source: Box::new(e),
    }
}
