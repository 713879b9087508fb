// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for PromptSense.
//!
//! Holds the shared error type, the label and preference types, and the
//! adapter traits for the collaborators the fusion pipeline calls out to:
//! embeddings, chat completion and the session store.

pub mod error;
pub mod traits;
pub mod types;

pub use error::PromptSenseError;
pub use types::{AdapterType, Domain, HealthStatus, Intent, UserPreferences};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, SessionStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Provider,
            AdapterType::Embedding,
            AdapterType::Storage,
        ] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_session_store<T: SessionStore>() {}
    }
}
