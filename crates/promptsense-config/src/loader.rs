// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./promptsense.toml` > `~/.config/promptsense/promptsense.toml`
//! > `/etc/promptsense/promptsense.toml`, with environment variable overrides via the
//! `PROMPTSENSE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PromptSenseConfig;

/// Config sections addressable from environment variables.
const ENV_SECTIONS: [&str; 6] = ["openai", "storage", "index", "retrieval", "refiner", "logging"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/promptsense/promptsense.toml` (system-wide)
/// 3. `~/.config/promptsense/promptsense.toml` (user XDG config)
/// 4. `./promptsense.toml` (local directory)
/// 5. `PROMPTSENSE_*` environment variables
pub fn load_config() -> Result<PromptSenseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PromptSenseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PromptSenseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PromptSenseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PromptSenseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PromptSenseConfig::default()))
        .merge(Toml::file("/etc/promptsense/promptsense.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("promptsense/promptsense.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("promptsense.toml"))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
///
/// Only the first `section_` is turned into `section.`, so underscores inside
/// key names survive: `openai_api_key` becomes `openai.api_key`.
pub fn env_key_to_path(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`, which would turn
/// `PROMPTSENSE_INDEX_FLUSH_INTERVAL` into `index.flush.interval`.
fn env_provider() -> Env {
    Env::prefixed("PROMPTSENSE_").map(|key| env_key_to_path(key.as_str()).into())
}
