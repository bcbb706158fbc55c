// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing material of uncommissioned endpoints.
//!
//! Codes are stored in the endpoint's namespace when the engine starts, so an
//! operator can look them up later without a running bridge.

use plexbridge_core::{BridgeError, PairingCode, StorageContext};
use qrcode::QrCode;
use qrcode::render::unicode;

const QR_KEY: &str = "qrPairingCode";
const MANUAL_KEY: &str = "manualPairingCode";

/// Store `code` in the endpoint namespace `ctx` is bound to.
pub async fn store_pairing(ctx: &StorageContext, code: &PairingCode) -> Result<(), BridgeError> {
    ctx.set(QR_KEY, &code.qr_pairing_code).await?;
    ctx.set(MANUAL_KEY, &code.manual_pairing_code).await
}

/// The codes last stored for the endpoint, if both are present.
pub async fn stored_pairing(ctx: &StorageContext) -> Result<Option<PairingCode>, BridgeError> {
    let qr = ctx.get::<String>(QR_KEY).await?;
    let manual = ctx.get::<String>(MANUAL_KEY).await?;
    Ok(qr.zip(manual).map(|(qr_pairing_code, manual_pairing_code)| PairingCode {
        qr_pairing_code,
        manual_pairing_code,
    }))
}

/// Render a QR payload as terminal block characters, two modules per line.
pub fn render_qr(payload: &str) -> Result<String, BridgeError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| BridgeError::Internal(format!("cannot encode pairing code: {e}")))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use plexbridge_test_utils::MemoryStore;

    #[tokio::test]
    async fn codes_are_read_back_from_the_endpoint_namespace() {
        let store = Arc::new(MemoryStore::new());
        let ctx = StorageContext::new(store.clone(), "hue");
        assert!(stored_pairing(&ctx).await.unwrap().is_none());

        let code = PairingCode {
            qr_pairing_code: "MT:Y.K9042C00KA0648G00".into(),
            manual_pairing_code: "34970112332".into(),
        };
        store_pairing(&ctx, &code).await.unwrap();
        assert_eq!(stored_pairing(&ctx).await.unwrap(), Some(code));

        let other = StorageContext::new(store, "shelly");
        assert!(stored_pairing(&other).await.unwrap().is_none());
    }

    #[test]
    fn qr_renders_as_block_characters() {
        let rendered = render_qr("MT:Y.K9042C00KA0648G00").unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines.len() > 10);
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
        assert!(rendered.contains('█') || rendered.contains('▀') || rendered.contains('▄'));
    }
}
