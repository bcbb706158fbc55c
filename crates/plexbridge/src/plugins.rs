// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `plexbridge plugins` command implementation.
//!
//! Opens the configured SQLite store, applies one registry operation, and
//! persists the result. Mutations back the database up first when
//! `backup_on_start` is set.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use plexbridge_bridge::BRIDGE_NAMESPACE;
use plexbridge_config::PlexbridgeConfig;
use plexbridge_core::{BridgeError, KeyValueStore, StorageContext};
use plexbridge_plugin::{PluginRecord, PluginRegistry};
use plexbridge_storage::{SqliteStore, backup_database};
use tracing::{debug, warn};

#[derive(Subcommand, Debug)]
pub enum PluginsCommand {
    /// List registered plugins in registry order.
    List {
        /// Print the registry as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Register the plugin in DIR (or the plugin.toml at that path).
    Add { path: PathBuf },
    /// Remove a plugin by name or by the path it was added from.
    Remove { plugin: String },
    /// Let a plugin take part in the bridge lifecycle.
    Enable { name: String },
    /// Keep a plugin registered but out of the bridge lifecycle.
    Disable { name: String },
}

impl PluginsCommand {
    fn mutates(&self) -> bool {
        !matches!(self, PluginsCommand::List { .. })
    }
}

/// Run a registry command against the configured database.
pub async fn run_plugins(
    config: &PlexbridgeConfig,
    command: PluginsCommand,
) -> Result<(), BridgeError> {
    let db_path = config.storage.database_path.as_str();
    if command.mutates() && config.storage.backup_on_start {
        if let Some(backup) = backup_database(Path::new(db_path))? {
            debug!(path = %backup.display(), "registry database backed up");
        }
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(db_path).await?);
    let use_color = std::io::stdout().is_terminal();
    let outcome = execute(store.clone(), command, use_color, &mut std::io::stdout()).await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close the registry database");
        outcome?;
        return Err(e);
    }
    outcome
}

async fn execute(
    store: Arc<dyn KeyValueStore>,
    command: PluginsCommand,
    use_color: bool,
    out: &mut impl Write,
) -> Result<(), BridgeError> {
    let mut registry = PluginRegistry::open(StorageContext::new(store, BRIDGE_NAMESPACE)).await?;

    match command {
        PluginsCommand::List { json, plain } => {
            if json {
                let text = serde_json::to_string_pretty(registry.list())
                    .map_err(|e| BridgeError::Internal(format!("cannot encode registry: {e}")))?;
                writeln!(out, "{text}").map_err(output_error)?;
            } else {
                print_list(registry.list(), use_color && !plain, out)?;
            }
        }
        PluginsCommand::Add { path } => {
            let record = registry.add(&path).await?;
            writeln!(
                out,
                "added {} {} ({}) from {}",
                record.name,
                record.version,
                record.capability,
                record.path.display()
            )
            .map_err(output_error)?;
        }
        PluginsCommand::Remove { plugin } => {
            let removed = registry.remove(&plugin).await?;
            writeln!(out, "removed {}", removed.name).map_err(output_error)?;
        }
        PluginsCommand::Enable { name } => {
            registry.set_enabled(&name, true).await?;
            writeln!(out, "enabled {name}").map_err(output_error)?;
        }
        PluginsCommand::Disable { name } => {
            registry.set_enabled(&name, false).await?;
            writeln!(out, "disabled {name}").map_err(output_error)?;
        }
    }
    Ok(())
}

fn print_list(
    records: &[PluginRecord],
    use_color: bool,
    out: &mut impl Write,
) -> Result<(), BridgeError> {
    if records.is_empty() {
        writeln!(out, "no plugins registered").map_err(output_error)?;
        return Ok(());
    }

    for record in records {
        let status = match (record.enabled, use_color) {
            (true, true) => {
                use colored::Colorize;
                "enabled ".green().to_string()
            }
            (false, true) => {
                use colored::Colorize;
                "disabled".yellow().to_string()
            }
            (true, false) => "enabled ".to_string(),
            (false, false) => "disabled".to_string(),
        };
        writeln!(
            out,
            "  {status}  {:<20} {:<10} {:<18} {}",
            record.name,
            record.version,
            record.capability.to_string(),
            record.path.display()
        )
        .map_err(output_error)?;
    }
    Ok(())
}

fn output_error(e: std::io::Error) -> BridgeError {
    BridgeError::Internal(format!("cannot write output: {e}"))
}
