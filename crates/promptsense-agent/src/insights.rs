// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user interaction summary.

use serde::Serialize;

use promptsense_core::PromptSenseError;
use promptsense_core::traits::SessionStore;
use promptsense_memory::VectorIndex;

use crate::pipeline::PromptPipeline;

/// Number of domains reported in [`UserInsights::common_domains`].
pub const TOP_DOMAINS: usize = 5;

/// How often a user asked with a given intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentCount {
    pub intent: String,
    pub count: u64,
}

/// Interaction patterns for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInsights {
    /// Most frequent first.
    pub intent_counts: Vec<IntentCount>,
    pub common_domains: Vec<String>,
    /// Vectors this user owns in the memory index.
    pub indexed_queries: usize,
}

/// Summarizes one user from the session store and the memory index.
///
/// Makes no model calls.
pub async fn user_insights(
    store: &dyn SessionStore,
    index: &VectorIndex,
    user_id: &str,
) -> Result<UserInsights, PromptSenseError> {
    let intent_counts = store
        .intent_counts(user_id)
        .await?
        .into_iter()
        .map(|(intent, count)| IntentCount { intent, count })
        .collect();
    let common_domains = store.common_domains(user_id, TOP_DOMAINS).await?;
    let indexed_queries = index.owner_count(user_id)?;

    Ok(UserInsights {
        intent_counts,
        common_domains,
        indexed_queries,
    })
}

impl PromptPipeline {
    pub async fn insights(&self, user_id: &str) -> Result<UserInsights, PromptSenseError> {
        user_insights(self.store().as_ref(), self.index(), user_id).await
    }
}
