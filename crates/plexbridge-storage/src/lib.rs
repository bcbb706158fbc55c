// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the plexbridge device bridge.
//!
//! A single namespaced key/value table holds the plugin registry and the
//! persisted endpoint identities. Migrations are embedded with refinery and
//! all statements are serialized through `tokio-rusqlite`.

pub mod backup;
pub mod database;
pub mod migrations;
pub mod store;

pub use backup::{backup_database, backup_path};
pub use database::Database;
pub use store::SqliteStore;
