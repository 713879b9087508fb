// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive sizes,
//! non-empty paths, sane ratios and a known log level.

use crate::diagnostic::ConfigError;
use crate::model::PromptSenseConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &PromptSenseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let index = &config.index;
    if index.dimension == 0 {
        errors.push(ConfigError::validation("index.dimension must be greater than 0"));
    }
    if index.flush_interval == 0 {
        errors.push(ConfigError::validation(
            "index.flush_interval must be at least 1",
        ));
    }
    if index.overfetch_multiplier == 0 {
        errors.push(ConfigError::validation(
            "index.overfetch_multiplier must be at least 1",
        ));
    }
    if index.vector_path.trim().is_empty() {
        errors.push(ConfigError::validation("index.vector_path must not be empty"));
    }
    if index.metadata_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "index.metadata_path must not be empty",
        ));
    }
    if !index.vector_path.trim().is_empty() && index.vector_path == index.metadata_path {
        errors.push(ConfigError::validation(format!(
            "index.vector_path and index.metadata_path must differ, both are `{}`",
            index.vector_path
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.retrieval.similar_queries_limit == 0 {
        errors.push(ConfigError::validation(
            "retrieval.similar_queries_limit must be at least 1",
        ));
    }

    if config.refiner.max_growth_ratio < 1.0 {
        errors.push(ConfigError::validation(format!(
            "refiner.max_growth_ratio must be at least 1.0, got {}",
            config.refiner.max_growth_ratio
        )));
    }
    if config.refiner.enabled && config.refiner.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "refiner.timeout_secs must be at least 1 when the refiner is enabled",
        ));
    }

    let temperature = config.openai.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        errors.push(ConfigError::validation(format!(
            "openai.temperature must be between 0.0 and 2.0, got {temperature}"
        )));
    }
    if config.openai.max_tokens == 0 {
        errors.push(ConfigError::validation(
            "openai.max_tokens must be greater than 0",
        ));
    }
    if config.openai.base_url.trim().is_empty() {
        errors.push(ConfigError::validation("openai.base_url must not be empty"));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
