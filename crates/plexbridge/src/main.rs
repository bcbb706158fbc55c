// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plexbridge - exposes plugin devices to commissioning controllers.
//!
//! This binary administers the persisted plugin registry and checks
//! configuration. The bridge itself is embedded by applications that link a
//! protocol engine and their plugins' factories.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod pairing;
mod plugins;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use plexbridge_config::PlexbridgeConfig;

use crate::plugins::PluginsCommand;

/// Plexbridge - exposes plugin devices to commissioning controllers.
#[derive(Parser, Debug)]
#[command(name = "plexbridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the plugin registry.
    Plugins {
        #[command(subcommand)]
        command: PluginsCommand,
    },
    /// Show the stored pairing codes of an uncommissioned endpoint.
    Pairing {
        /// Endpoint namespace: a plugin name in per-plugin mode. Defaults to
        /// the shared aggregator.
        endpoint: Option<String>,
        /// Print the codes without rendering the QR code.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, reporting every problem found.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> Result<PlexbridgeConfig, Vec<plexbridge_config::ConfigError>> {
    match path {
        Some(path) => plexbridge_config::load_and_validate_path(path),
        None => plexbridge_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            plexbridge_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.bridge.log_level);

    let result = match cli.command {
        Commands::Plugins { command } => plugins::run_plugins(&config, command).await,
        Commands::Pairing { endpoint, plain } => {
            pairing::run_pairing(&config, endpoint, plain).await
        }
        Commands::Config {
            command: ConfigCommand::Check,
        } => {
            check::print_config(&config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output on stdout stays scriptable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plexbridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn parses_registry_commands() {
        let cli = Cli::try_parse_from(["plexbridge", "plugins", "remove", "hue"]).unwrap();
        match cli.command {
            Commands::Plugins {
                command: PluginsCommand::Remove { plugin },
            } => assert_eq!(plugin, "hue"),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "plexbridge",
            "--config",
            "/tmp/p.toml",
            "plugins",
            "list",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(
            cli.command,
            Commands::Plugins {
                command: PluginsCommand::List { json: true, .. }
            }
        ));
    }

    #[test]
    fn parses_pairing_command() {
        let cli = Cli::try_parse_from(["plexbridge", "pairing", "hue", "--plain"]).unwrap();
        match cli.command {
            Commands::Pairing { endpoint, plain } => {
                assert_eq!(endpoint.as_deref(), Some("hue"));
                assert!(plain);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let cli = Cli::try_parse_from(["plexbridge", "pairing"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pairing { endpoint: None, plain: false }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["plexbridge"]).is_err());
        assert!(Cli::try_parse_from(["plexbridge", "plugins", "add"]).is_err());
    }
}
