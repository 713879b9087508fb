// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context fusion for PromptSense prompt assembly.
//!
//! Turns one user message plus everything known about the user into the
//! input for the response model:
//! - **LlmClassifier**: intent and domain labels
//! - **QueryRefiner**: optional cleanup of the raw message
//! - **FusionEngine**: annotated prompt block and bounded turn list
//! - **derive_instructions**: preference- and intent-driven response guidance

pub mod classifier;
pub mod fusion;
pub mod instructions;
pub mod refiner;

pub use classifier::{Classification, LlmClassifier};
pub use fusion::{
    FusedPrompt, FusionContext, FusionEngine, MAX_HISTORY_TURNS, MAX_MODEL_TURNS, SYSTEM_PROMPT,
};
pub use instructions::derive_instructions;
pub use refiner::QueryRefiner;
