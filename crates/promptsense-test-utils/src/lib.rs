// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for PromptSense integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock chat provider with queued replies and failure injection
//! - [`MockEmbedder`] - Deterministic embedding adapter
//! - [`InMemorySessionStore`] - Session store without SQLite
//! - [`TestHarness`] - Full pipeline over a temp directory

pub mod harness;
pub mod memory_store;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::TestHarness;
pub use memory_store::InMemorySessionStore;
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
