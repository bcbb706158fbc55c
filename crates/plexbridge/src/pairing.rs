// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `plexbridge pairing` command implementation.
//!
//! Prints the pairing codes the bridge stored for an uncommissioned endpoint,
//! with the QR code rendered for scanning.

use std::io::Write;
use std::sync::Arc;

use plexbridge_bridge::{BRIDGE_NAMESPACE, render_qr, stored_pairing};
use plexbridge_config::PlexbridgeConfig;
use plexbridge_core::{BridgeError, KeyValueStore, StorageContext};
use plexbridge_storage::SqliteStore;
use tracing::warn;

/// Show the pairing codes of `endpoint` (the shared aggregator when `None`).
pub async fn run_pairing(
    config: &PlexbridgeConfig,
    endpoint: Option<String>,
    plain: bool,
) -> Result<(), BridgeError> {
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::open(&config.storage.database_path).await?);
    let namespace = endpoint.unwrap_or_else(|| BRIDGE_NAMESPACE.to_string());
    let outcome = show(store.clone(), &namespace, plain, &mut std::io::stdout()).await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close the database");
    }
    outcome
}

async fn show(
    store: Arc<dyn KeyValueStore>,
    namespace: &str,
    plain: bool,
    out: &mut impl Write,
) -> Result<(), BridgeError> {
    let ctx = StorageContext::new(store, namespace);
    let Some(code) = stored_pairing(&ctx).await? else {
        return Err(BridgeError::Internal(format!(
            "no pairing code stored for endpoint {namespace}; it may already be commissioned"
        )));
    };

    if !plain {
        line(out, &render_qr(&code.qr_pairing_code)?)?;
    }
    line(out, &format!("qr pairing code:     {}", code.qr_pairing_code))?;
    line(out, &format!("manual pairing code: {}", code.manual_pairing_code))
}

fn line(out: &mut impl Write, text: &str) -> Result<(), BridgeError> {
    writeln!(out, "{text}").map_err(|e| BridgeError::Internal(format!("cannot write output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexbridge_bridge::store_pairing;
    use plexbridge_core::PairingCode;

    async fn store_with_code(namespace: &str) -> Arc<dyn KeyValueStore> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let code = PairingCode {
            qr_pairing_code: "MT:Y.K9042C00KA0648G00".into(),
            manual_pairing_code: "34970112332".into(),
        };
        store_pairing(&StorageContext::new(store.clone(), namespace), &code)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn prints_codes_with_qr() {
        let store = store_with_code(BRIDGE_NAMESPACE).await;
        let mut out = Vec::new();
        show(store, BRIDGE_NAMESPACE, false, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("manual pairing code: 34970112332"));
        assert!(text.lines().count() > 10);
    }

    #[tokio::test]
    async fn plain_output_skips_the_qr() {
        let store = store_with_code("hue").await;
        let mut out = Vec::new();
        show(store, "hue", true, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "qr pairing code:     MT:Y.K9042C00KA0648G00\nmanual pairing code: 34970112332\n"
        );
    }

    #[tokio::test]
    async fn missing_codes_are_an_error() {
        let store = store_with_code("hue").await;
        let mut out = Vec::new();
        let err = show(store, "shelly", true, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("no pairing code stored for endpoint shelly"));
        assert!(out.is_empty());
    }
}
