// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifest parsing from `plugin.toml` files.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use plexbridge_core::{BridgeError, CapabilityType};
use serde::{Deserialize, Serialize};

/// File name looked up when a plugin directory is given.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Parsed plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name; also the storage namespace of its endpoint.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    pub description: String,
    pub author: Option<String>,
    /// What the plugin contributes.
    pub capability: CapabilityType,
    /// Factory entry point looked up in the loader's table.
    pub entry: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginManifestFile {
    plugin: PluginSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    author: Option<String>,
    capability_type: String,
    entry: Option<String>,
}

/// Parse a plugin manifest from TOML content.
///
/// Name and version must be non-empty, the version must be semver, and the
/// capability must be `AccessoryPlatform` or `DynamicPlatform`. A missing
/// `entry` defaults to the plugin name.
pub fn parse_plugin_manifest(toml_content: &str) -> Result<PluginManifest, BridgeError> {
    let file: PluginManifestFile =
        toml::from_str(toml_content).map_err(|e| BridgeError::Manifest(e.to_string()))?;
    let section = file.plugin;

    if section.name.trim().is_empty() {
        return Err(BridgeError::Manifest("name must not be empty".to_string()));
    }

    if section.version.trim().is_empty() {
        return Err(BridgeError::Manifest("version must not be empty".to_string()));
    }

    semver::Version::parse(&section.version).map_err(|e| {
        BridgeError::Manifest(format!("version `{}` is not semver: {e}", section.version))
    })?;

    let capability = CapabilityType::from_str(&section.capability_type).map_err(|_| {
        BridgeError::Manifest(format!(
            "invalid capability_type '{}'. Expected one of: AccessoryPlatform, DynamicPlatform",
            section.capability_type
        ))
    })?;

    let entry = section.entry.unwrap_or_else(|| section.name.clone());

    Ok(PluginManifest {
        name: section.name,
        version: section.version,
        description: section.description,
        author: section.author,
        capability,
        entry,
    })
}

/// Resolve a plugin path (directory or manifest file) to its directory and
/// manifest file.
pub fn manifest_location(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_dir() {
        (path.to_path_buf(), path.join(MANIFEST_FILE))
    } else {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, path.to_path_buf())
    }
}

/// Read and parse the manifest of the plugin at `path`.
///
/// Returns the manifest together with the plugin directory.
pub fn read_manifest(path: &Path) -> Result<(PluginManifest, PathBuf), BridgeError> {
    let (dir, file) = manifest_location(path);
    let content = std::fs::read_to_string(&file)
        .map_err(|e| BridgeError::Manifest(format!("cannot read {}: {e}", file.display())))?;
    let manifest = parse_plugin_manifest(&content)?;
    let dir = std::fs::canonicalize(&dir).unwrap_or(dir);
    Ok((manifest, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_manifest() {
        let toml = r#"
[plugin]
name = "hue"
version = "1.2.0"
description = "Hue lights"
author = "Plexbridge Contributors"
capability_type = "DynamicPlatform"
entry = "hue-factory"
"#;
        let manifest = parse_plugin_manifest(toml).unwrap();
        assert_eq!(manifest.name, "hue");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.capability, CapabilityType::MultiDevice);
        assert_eq!(manifest.entry, "hue-factory");
        assert_eq!(manifest.author.as_deref(), Some("Plexbridge Contributors"));
    }

    #[test]
    fn entry_defaults_to_name() {
        let toml = r#"
[plugin]
name = "doorbell"
version = "0.1.0"
capability_type = "AccessoryPlatform"
"#;
        let manifest = parse_plugin_manifest(toml).unwrap();
        assert_eq!(manifest.entry, "doorbell");
        assert_eq!(manifest.capability, CapabilityType::SingleDevice);
        assert!(manifest.description.is_empty());
        assert!(manifest.author.is_none());
    }

    #[test]
    fn parse_invalid_capability() {
        let toml = r#"
[plugin]
name = "bad"
version = "0.1.0"
capability_type = "ExtensionPlatform"
"#;
        let err = parse_plugin_manifest(toml).unwrap_err().to_string();
        assert!(err.contains("invalid capability_type"));
    }

    #[test]
    fn parse_missing_name() {
        let toml = r#"
[plugin]
name = ""
version = "0.1.0"
capability_type = "AccessoryPlatform"
"#;
        let err = parse_plugin_manifest(toml).unwrap_err().to_string();
        assert!(err.contains("name must not be empty"));
    }

    #[test]
    fn parse_bad_version() {
        let toml = r#"
[plugin]
name = "x"
version = "one"
capability_type = "AccessoryPlatform"
"#;
        let err = parse_plugin_manifest(toml).unwrap_err().to_string();
        assert!(err.contains("not semver"));
    }

    #[test]
    fn read_from_directory_or_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "[plugin]\nname = \"hue\"\nversion = \"1.0.0\"\ncapability_type = \"DynamicPlatform\"\n",
        )
        .unwrap();

        let (from_dir, plugin_dir) = read_manifest(dir.path()).unwrap();
        let (from_file, _) = read_manifest(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(from_dir, from_file);
        assert_eq!(plugin_dir, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_manifest(dir.path()),
            Err(BridgeError::Manifest(_))
        ));
    }
}
