// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response instructions derived from user preferences and intent.

use promptsense_core::types::{ExpertiseLevel, Intent, Tone, UserPreferences};

/// Builds the instruction text for one request.
///
/// Non-empty custom instructions replace everything else. Otherwise the
/// expertise, tone and intent clauses are joined as sentences.
pub fn derive_instructions(preferences: &UserPreferences, intent: Intent) -> String {
    if let Some(custom) = preferences.custom_instructions.as_deref() {
        if !custom.trim().is_empty() {
            return custom.to_string();
        }
    }

    let mut clauses = vec![expertise_clause(preferences.expertise_level)];
    if let Some(tone) = preferences.tone {
        clauses.push(tone_clause(tone));
    }
    if let Some(clause) = intent_clause(intent) {
        clauses.push(clause);
    }
    clauses.join(". ")
}

fn expertise_clause(level: Option<ExpertiseLevel>) -> &'static str {
    match level {
        Some(ExpertiseLevel::Beginner) => "Explain concepts in simple terms with examples",
        Some(ExpertiseLevel::Advanced) => "Provide detailed technical information",
        _ => "Balance detail with clarity",
    }
}

fn tone_clause(tone: Tone) -> &'static str {
    match tone {
        Tone::Friendly => "Use a warm, approachable tone",
        Tone::Professional => "Maintain a professional, concise tone",
        Tone::Casual => "Keep the tone relaxed and conversational",
    }
}

fn intent_clause(intent: Intent) -> Option<&'static str> {
    match intent {
        Intent::Learning => Some("Focus on educational value and understanding"),
        Intent::ProblemSolving => Some("Provide actionable solutions and steps"),
        Intent::Creative => Some("Be creative and offer diverse ideas"),
        _ => None,
    }
}
