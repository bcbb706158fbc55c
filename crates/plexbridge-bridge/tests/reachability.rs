// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection signals, commissioning, pairing material, and shutdown.

mod common;

use std::time::Duration;

use common::{TestBridge, settle};
use plexbridge_core::{DeviceId, EngineEvent, FabricIndex, PluginState, SessionInfo, Topology};
use plexbridge_test_utils::{MockPlugin, fixtures};

#[tokio::test(start_paused = true)]
async fn repeated_connection_signal_has_one_effect() {
    let a = MockPlugin::multi("a").with_device(fixtures::light("a-1"));
    let b = MockPlugin::multi("b").with_device(fixtures::light("b-1"));
    let mut t = TestBridge::builder(Topology::SingleAggregator)
        .plugin(&a)
        .plugin(&b)
        .start()
        .await;

    t.engine.connect("bridge");
    settle().await;
    t.engine.connect("bridge");
    settle().await;

    let endpoint = t.engine.endpoint("bridge").unwrap();
    assert_eq!(endpoint.reachable_history(), [true]);
    assert_eq!(endpoint.device_reachable_history().len(), 2);
    assert_eq!(endpoint.attach_count(), 2);

    let snapshot = t.snapshot().await;
    for name in ["a", "b"] {
        let status = snapshot.plugin(name).unwrap();
        assert!(status.connected);
        assert!(status.paired);
    }
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn propagator_connect_is_idempotent() {
    let a = MockPlugin::multi("a");
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&a)
        .start()
        .await;
    let propagator = t.bridge.propagator();

    assert!(propagator.connect("a").await);
    assert!(!propagator.connect("a").await);
    assert!(!propagator.connect("missing").await);
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn session_without_subscription_is_not_a_connection() {
    let a = MockPlugin::multi("a").with_device(fixtures::light("a-1"));
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&a)
        .start()
        .await;

    t.engine.emit(EngineEvent::SessionsChanged {
        endpoint: "a".to_string(),
        fabric: FabricIndex(1),
        sessions: vec![SessionInfo {
            peer_active: true,
            secure: true,
            active_subscriptions: 0,
        }],
    });
    settle().await;

    assert_eq!(
        t.snapshot().await.plugin("a").unwrap().state,
        PluginState::AwaitingConnection
    );
    assert_eq!(t.engine.endpoint("a").unwrap().attach_count(), 0);
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_attachment() {
    let a = MockPlugin::multi("a").with_device(fixtures::light("a-1"));
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&a)
        .start()
        .await;

    t.engine.connect("a");
    tokio::time::sleep(Duration::from_millis(100)).await;
    t.stop().await.unwrap();
    settle().await;
    assert_eq!(t.engine.endpoint("a").unwrap().attach_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn commissioning_changes_toggle_paired() {
    let hue = MockPlugin::multi("hue");
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&hue)
        .start()
        .await;
    assert!(!t.snapshot().await.plugin("hue").unwrap().paired);

    t.engine.commissioning_changed("hue", 1);
    settle().await;
    assert!(t.snapshot().await.plugin("hue").unwrap().paired);

    t.engine.commissioning_changed("hue", 0);
    settle().await;
    assert!(!t.snapshot().await.plugin("hue").unwrap().paired);
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn pairing_codes_are_stored_for_uncommissioned_endpoints() {
    let a = MockPlugin::multi("a");
    let mut t = TestBridge::builder(Topology::SingleAggregator)
        .plugin(&a)
        .start()
        .await;

    let serial = t
        .engine
        .endpoint("bridge")
        .unwrap()
        .identity()
        .serial_number
        .clone();
    let keys = t.store.keys("bridge").await;
    assert!(keys.contains(&"qrPairingCode".to_string()));
    assert!(keys.contains(&"manualPairingCode".to_string()));

    let snapshot = t.snapshot().await;
    let endpoint = &snapshot.endpoints[0];
    assert!(!endpoint.commissioned);
    assert_eq!(
        endpoint.pairing.as_ref().unwrap().qr_pairing_code,
        format!("MT:{serial}")
    );
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn commissioned_endpoint_marks_plugin_paired() {
    let hue = MockPlugin::multi("hue").start_delay(Duration::from_secs(10));
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&hue)
        .build()
        .await;
    t.spawn();

    // The aggregator exists before the plugin's start resolves.
    tokio::time::sleep(Duration::from_secs(1)).await;
    t.engine.endpoint("hue").unwrap().set_commissioned(true);
    t.wait_running().await;

    assert!(t.snapshot().await.plugin("hue").unwrap().paired);
    assert!(!t.store.keys("hue").await.contains(&"qrPairingCode".to_string()));
    t.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_bounded_by_the_grace_period() {
    let slow = MockPlugin::multi("slow").shutdown_delay(Duration::from_secs(60));
    let quick = MockPlugin::multi("quick");
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&slow)
        .plugin(&quick)
        .configure(|c| c.lifecycle.shutdown_grace_secs = 2)
        .start()
        .await;

    let began = tokio::time::Instant::now();
    t.stop().await.unwrap();
    let elapsed = began.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(60));
    assert_eq!(quick.recorder().shutdown_count(), 1);
    assert_eq!(slow.recorder().shutdown_count(), 0);
    assert_eq!(t.engine.stop_count(), 1);
    assert_eq!(t.store.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_runs_once() {
    let a = MockPlugin::multi("a");
    let mut t = TestBridge::builder(Topology::SingleAggregator)
        .plugin(&a)
        .start()
        .await;

    t.stop().await.unwrap();
    t.bridge.shutdown("again").await.unwrap();
    assert_eq!(a.recorder().shutdown_count(), 1);
    assert_eq!(t.engine.stop_count(), 1);
    assert_eq!(t.store.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reachability_is_published_per_device() {
    let a = MockPlugin::single("a").with_device(fixtures::light("lamp"));
    let mut t = TestBridge::builder(Topology::PerPlugin)
        .plugin(&a)
        .start()
        .await;

    t.engine.connect("a");
    settle().await;
    let endpoint = t.engine.endpoint("a").unwrap();
    assert_eq!(endpoint.reachable_history(), [true]);
    assert_eq!(
        endpoint.device_reachable_history(),
        [(DeviceId("lamp".into()), true)]
    );
    t.stop().await.unwrap();
}
