// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `plexbridge config check` output.

use std::fmt::Write;

use plexbridge_config::PlexbridgeConfig;

/// Print the effective configuration after it loaded and validated.
pub fn print_config(config: &PlexbridgeConfig) {
    print!("{}", summary(config));
}

fn summary(config: &PlexbridgeConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "configuration OK");
    let _ = writeln!(out, "  mode:             {}", config.bridge.mode);
    let _ = writeln!(out, "  log level:        {}", config.bridge.log_level);
    let _ = writeln!(out, "  database:         {}", config.storage.database_path);
    let _ = writeln!(out, "  backup on start:  {}", config.storage.backup_on_start);
    let _ = writeln!(
        out,
        "  start timeout:    {}s",
        config.lifecycle.start_timeout_secs
    );
    let _ = writeln!(
        out,
        "  shutdown grace:   {}s",
        config.lifecycle.shutdown_grace_secs
    );
    let _ = writeln!(
        out,
        "  connect settle:   {}ms",
        config.lifecycle.connect_settle_ms
    );
    let _ = writeln!(
        out,
        "  identity:         {} ({:#06x}) / {} ({:#06x})",
        config.identity.vendor_name,
        config.identity.vendor_id,
        config.identity.product_name,
        config.identity.product_id
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_shows_effective_values() {
        let config = plexbridge_config::load_and_validate_str(
            "[bridge]\nmode = \"childbridge\"\n[lifecycle]\nstart_timeout_secs = 45\n",
        )
        .unwrap();
        let text = summary(&config);
        assert!(text.starts_with("configuration OK"));
        assert!(text.contains("mode:             childbridge"));
        assert!(text.contains("start timeout:    45s"));
        assert!(text.contains("(0xfff1)"));
    }
}
