// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for PromptSense.

use thiserror::Error;

/// The primary error type used across all PromptSense adapter traits and core operations.
#[derive(Debug, Error)]
pub enum PromptSenseError {
    /// Configuration errors (invalid TOML, missing API key, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A vector's length disagrees with the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Saving or loading the index artifacts failed.
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Session store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding generation failed or returned an unusable vector.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The classifier returned nothing usable.
    #[error("classification error: {message}")]
    Classification { message: String },

    /// LLM provider errors (API failure, empty completion, bad response body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller input rejected before any work was done.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PromptSenseError {
    /// Shorthand for a [`PromptSenseError::Persistence`] wrapping an I/O or parse error.
    pub fn persistence(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PromptSenseError::Persistence {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error came from an outside collaborator call (embedding,
    /// classification, generation). These degrade to fallback values instead
    /// of failing a request.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            PromptSenseError::Embedding { .. }
                | PromptSenseError::Classification { .. }
                | PromptSenseError::Provider { .. }
                | PromptSenseError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_failures_are_classified() {
        let embed = PromptSenseError::Embedding {
            message: "down".into(),
            source: None,
        };
        let timeout = PromptSenseError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        assert!(embed.is_collaborator_failure());
        assert!(timeout.is_collaborator_failure());

        let mismatch = PromptSenseError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(!mismatch.is_collaborator_failure());
        assert_eq!(mismatch.to_string(), "dimension mismatch: expected 4, got 3");
    }

    #[test]
    fn persistence_helper_keeps_source() {
        let err = PromptSenseError::persistence(
            "failed to write index",
            std::io::Error::other("disk full"),
        );
        match err {
            PromptSenseError::Persistence { message, source } => {
                assert_eq!(message, "failed to write index");
                assert_eq!(source.map(|s| s.to_string()).as_deref(), Some("disk full"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
