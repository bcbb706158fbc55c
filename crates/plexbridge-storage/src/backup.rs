// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup backup of the bridge database.
//!
//! Uses rusqlite's Backup API so the copy is consistent even in WAL mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use plexbridge_core::BridgeError;
use rusqlite::Connection;
use tracing::{debug, info};

/// Path of the backup written next to `db_path`: `<stem>.backup.db`.
pub fn backup_path(db_path: &Path) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "plexbridge".to_string());
    db_path.with_file_name(format!("{stem}.backup.db"))
}

/// Copy the database at `db_path` to its backup path.
///
/// Returns `Ok(None)` when the database does not exist yet (first run).
pub fn backup_database(db_path: &Path) -> Result<Option<PathBuf>, BridgeError> {
    if !db_path.exists() {
        info!(path = %db_path.display(), "no database to back up, first run");
        return Ok(None);
    }

    let target = backup_path(db_path);
    let src = Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| BridgeError::Storage {
        source: Box::new(e),
    })?;

    let mut dst = Connection::open(&target).map_err(|e| BridgeError::Storage {
        source: Box::new(e),
    })?;

    let backup =
        rusqlite::backup::Backup::new(&src, &mut dst).map_err(|e| BridgeError::Storage {
            source: Box::new(e),
        })?;

    // 100 pages per step, 10ms between steps.
    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(|e| BridgeError::Storage {
            source: Box::new(e),
        })?;

    debug!(from = %db_path.display(), to = %target.display(), "database backed up");
    Ok(Some(target))
}
