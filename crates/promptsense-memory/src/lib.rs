// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector memory for PromptSense.
//!
//! Stores one embedding per past user query and answers exact
//! nearest-neighbor queries over them, scoped to a single user.
//!
//! ## Architecture
//!
//! - **VectorIndex**: lock-guarded in-memory store with brute-force L2 search,
//!   periodic flushing and owner-level rebuild
//! - **Snapshot**: paired vector blob and JSON manifest on disk
//! - **NeighborRetriever**: embed-then-search front end used by the pipeline
//! - **Types**: EntryMetadata, NewEntry, Neighbor, IndexStats

pub mod index;
pub mod retriever;
pub mod snapshot;
pub mod types;

pub use index::{IndexOptions, VectorIndex};
pub use retriever::{NeighborRetriever, Retrieval};
pub use types::*;
