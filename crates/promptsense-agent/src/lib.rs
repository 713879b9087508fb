// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration for PromptSense.
//!
//! The [`PromptPipeline`] is the central coordinator that:
//! - Loads preferences and recent turns from the session store
//! - Classifies intent and domain
//! - Retrieves similar past queries from the vector index
//! - Fuses everything into one personalized prompt
//! - Generates the response and records the exchange

pub mod insights;
pub mod pipeline;
pub mod titles;

pub use insights::{IntentCount, UserInsights, user_insights};
pub use pipeline::{ChatOutcome, GENERIC_FAILURE, PromptPipeline};
