// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context fusion: merges preferences, classification, recent turns and
//! retrieved neighbors into the model-input turn list and the annotated
//! prompt block.
//!
//! Merging is pure and deterministic. Each line of the annotated block is
//! omitted when its source is empty, and the remaining lines always appear in
//! the same order.

use promptsense_core::types::{
    Domain, ExpertiseLevel, Intent, ProviderMessage, RecentTurn, Tone, UserPreferences,
};
use promptsense_memory::Neighbor;

use crate::instructions::derive_instructions;

/// System turn that opens every model-input sequence.
pub const SYSTEM_PROMPT: &str = "You are PromptSense, an intelligent assistant that provides personalized, context-aware responses. Pay attention to the user profile, intent, and context provided in the enhanced prompt.";

/// Recent turns replayed verbatim to the model.
pub const MAX_HISTORY_TURNS: usize = 6;

/// Neighbor texts quoted in the similar-queries line.
pub const SIMILAR_QUERY_PREVIEW: usize = 2;

/// Recent turns whose domains feed the recent-topics line.
pub const RECENT_TOPIC_WINDOW: usize = 3;

/// Upper bound on the turn list: system + history + the annotated user turn.
pub const MAX_MODEL_TURNS: usize = MAX_HISTORY_TURNS + 2;

/// Everything one fusion request needs. Built per request and dropped after.
#[derive(Debug, Clone, Default)]
pub struct FusionContext {
    pub message: String,
    /// Refined form of `message`, when refinement ran and produced one.
    pub refined: Option<String>,
    pub intent: Intent,
    pub domain: Domain,
    pub preferences: UserPreferences,
    /// Chronological, oldest first.
    pub recent_turns: Vec<RecentTurn>,
    /// Nearest first.
    pub neighbors: Vec<Neighbor>,
}

/// Output of [`FusionEngine::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct FusedPrompt {
    /// System turn, replayed history, then one user turn holding `annotated`.
    pub turns: Vec<ProviderMessage>,
    pub annotated: String,
}

/// Deterministic merger of request context into model input.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    system_prompt: String,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionEngine {
    pub fn new() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Builds the annotated block and the turn list for one request.
    pub fn merge(&self, ctx: &FusionContext) -> FusedPrompt {
        let annotated = annotate(ctx);

        let history_start = ctx.recent_turns.len().saturating_sub(MAX_HISTORY_TURNS);
        let mut turns = Vec::with_capacity(MAX_MODEL_TURNS);
        turns.push(ProviderMessage::system(self.system_prompt.clone()));
        turns.extend(ctx.recent_turns[history_start..].iter().map(|t| ProviderMessage {
            role: t.role.clone(),
            content: t.content.clone(),
        }));
        turns.push(ProviderMessage::user(annotated.clone()));

        FusedPrompt { turns, annotated }
    }
}

fn annotate(ctx: &FusionContext) -> String {
    let mut parts = Vec::with_capacity(6);

    let expertise = ctx
        .preferences
        .expertise_level
        .unwrap_or(ExpertiseLevel::Intermediate);
    let tone = ctx.preferences.tone.unwrap_or(Tone::Professional);
    parts.push(format!(
        "[User Profile: {expertise} level, prefers {tone} tone]"
    ));

    parts.push(format!(
        "[Detected Domain: {}, Intent: {}]",
        ctx.domain, ctx.intent
    ));

    if !ctx.neighbors.is_empty() {
        let texts: Vec<&str> = ctx
            .neighbors
            .iter()
            .take(SIMILAR_QUERY_PREVIEW)
            .map(|n| n.text.as_str())
            .collect();
        parts.push(format!(
            "[User previously asked similar questions: {}]",
            texts.join(", ")
        ));
    }

    let topics = recent_topics(&ctx.recent_turns);
    if !topics.is_empty() {
        parts.push(format!(
            "[Recent conversation topics: {}]",
            topics.join(", ")
        ));
    }

    let instructions = derive_instructions(&ctx.preferences, ctx.intent);
    if !instructions.is_empty() {
        parts.push(format!("[Instructions: {instructions}]"));
    }

    match ctx.refined.as_deref() {
        Some(refined)
            if !refined.is_empty() && refined.to_lowercase() != ctx.message.to_lowercase() =>
        {
            parts.push(format!(
                "\nOriginal Query: {}\nRefined Query: {refined}",
                ctx.message
            ));
        }
        _ => parts.push(format!("\nUser Query: {}", ctx.message)),
    }

    parts.join("\n")
}

/// Distinct domains of the last few turns, in first-appearance order.
fn recent_topics(turns: &[RecentTurn]) -> Vec<&str> {
    let start = turns.len().saturating_sub(RECENT_TOPIC_WINDOW);
    let mut topics: Vec<&str> = Vec::new();
    for turn in &turns[start..] {
        let domain = turn.domain.as_deref().unwrap_or("general");
        if !topics.contains(&domain) {
            topics.push(domain);
        }
    }
    topics
}
