// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled in with `embed_migrations!` and
//! applied every time the database is opened.

use plexbridge_core::BridgeError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BridgeError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| BridgeError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
