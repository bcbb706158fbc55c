// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for plexbridge integration tests.
//!
//! - [`MockPlugin`] / [`MockPlatform`]: scriptable plugins with a factory and manifest
//! - [`MockEngine`] / [`MockEndpoint`]: an engine that records endpoints and injects events
//! - [`MemoryStore`]: in-memory key/value persistence
//! - [`fixtures`]: ready-made devices

pub mod fixtures;
pub mod memory_store;
pub mod mock_engine;
pub mod mock_platform;

pub use memory_store::MemoryStore;
pub use mock_engine::{MockEndpoint, MockEngine};
pub use mock_platform::{MockPlatform, MockPlugin, PlatformRecorder, StartBehavior};
