// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the PromptSense pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Storage,
}

// --- Classification labels ---

/// What the user is trying to do with a message.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Learning,
    ProblemSolving,
    Creative,
    Analysis,
    /// Fallback when classification fails.
    #[default]
    Conversation,
    Clarification,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Learning,
        Intent::ProblemSolving,
        Intent::Creative,
        Intent::Analysis,
        Intent::Conversation,
        Intent::Clarification,
    ];
}

/// Subject area of a message.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Technology,
    Science,
    Business,
    Creative,
    Education,
    Health,
    Travel,
    /// Fallback when classification fails.
    #[default]
    General,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Technology,
        Domain::Science,
        Domain::Business,
        Domain::Creative,
        Domain::Education,
        Domain::Health,
        Domain::Travel,
        Domain::General,
    ];
}

// --- User preferences ---

/// Preferred response tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Friendly,
    Professional,
    Casual,
}

/// Self-reported expertise of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Typed personalization preferences for one user.
///
/// Stored as a JSON column; unrecognized keys are rejected on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise_level: Option<ExpertiseLevel>,
    /// Free-form instructions that replace all derived instructions when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_domains: Vec<String>,
}

impl UserPreferences {
    /// Overlays every field set in `other` onto `self`.
    pub fn merge(&mut self, other: UserPreferences) {
        if other.tone.is_some() {
            self.tone = other.tone;
        }
        if other.expertise_level.is_some() {
            self.expertise_level = other.expertise_level;
        }
        if other.custom_instructions.is_some() {
            self.custom_instructions = other.custom_instructions;
        }
        if !other.preferred_domains.is_empty() {
            self.preferred_domains = other.preferred_domains;
        }
    }
}

// --- Session store types ---

/// One prior turn of dialogue, as returned by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTurn {
    pub role: String,
    pub content: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
}

/// A message to be written to the session store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: String,
    pub conversation_id: Option<String>,
    pub role: String,
    pub content: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
    pub enhanced_prompt: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A message row read back from the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub user_id: String,
    pub conversation_id: Option<String>,
    pub role: String,
    pub content: String,
    pub intent: Option<String>,
    pub domain: Option<String>,
    pub enhanced_prompt: Option<String>,
    pub metadata: Option<String>,
    pub vector_saved: bool,
    pub created_at: String,
}

/// A titled thread of messages belonging to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub message_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

// --- Provider types ---

/// A single role/content turn sent to a chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

impl ProviderMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model override. `None` uses the adapter's configured chat model.
    pub model: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Token counts reported by a provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn intent_labels_parse_in_snake_case() {
        for intent in Intent::ALL {
            let label = intent.to_string();
            assert_eq!(Intent::from_str(&label).unwrap(), intent);
        }
        assert_eq!(Intent::ProblemSolving.to_string(), "problem_solving");
        assert!(Intent::from_str("rant").is_err());
    }

    #[test]
    fn domain_defaults_to_general() {
        assert_eq!(Domain::default(), Domain::General);
        assert_eq!(Intent::default(), Intent::Conversation);
        assert_eq!(Domain::from_str("travel").unwrap(), Domain::Travel);
    }

    #[test]
    fn preferences_reject_unknown_keys() {
        let err = serde_json::from_str::<UserPreferences>(r#"{"tone":"friendly","mood":"x"}"#);
        assert!(err.is_err());

        let prefs: UserPreferences =
            serde_json::from_str(r#"{"tone":"casual","preferred_domains":["science"]}"#).unwrap();
        assert_eq!(prefs.tone, Some(Tone::Casual));
        assert_eq!(prefs.expertise_level, None);
        assert_eq!(prefs.preferred_domains, vec!["science"]);
    }

    #[test]
    fn preferences_merge_only_overwrites_set_fields() {
        let mut base = UserPreferences {
            tone: Some(Tone::Friendly),
            expertise_level: Some(ExpertiseLevel::Beginner),
            custom_instructions: None,
            preferred_domains: vec!["health".into()],
        };
        base.merge(UserPreferences {
            expertise_level: Some(ExpertiseLevel::Advanced),
            ..UserPreferences::default()
        });
        assert_eq!(base.tone, Some(Tone::Friendly));
        assert_eq!(base.expertise_level, Some(ExpertiseLevel::Advanced));
        assert_eq!(base.preferred_domains, vec!["health"]);
    }

    #[test]
    fn empty_preferences_serialize_to_empty_object() {
        let json = serde_json::to_string(&UserPreferences::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
