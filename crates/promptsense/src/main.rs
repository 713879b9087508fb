// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PromptSense - personalized prompting with per-user memory.
//!
//! This is the binary entry point for the `promptsense` CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod inspect;
mod runtime;
mod shell;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use promptsense_agent::ChatOutcome;
use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use promptsense_core::types::{ExpertiseLevel, Tone, UserPreferences};

/// Crates whose spans and events the default filter lets through.
const LOG_TARGETS: [&str; 7] = [
    "promptsense",
    "promptsense_agent",
    "promptsense_context",
    "promptsense_memory",
    "promptsense_openai",
    "promptsense_storage",
    "promptsense_config",
];

/// PromptSense - personalized prompting with per-user memory.
#[derive(Parser, Debug)]
#[command(name = "promptsense", version, about, long_about = None)]
struct Cli {
    /// Path to a promptsense.toml to use instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message through the pipeline and print the response.
    Chat {
        #[arg(long, short)]
        user: String,
        /// Continue an existing conversation.
        #[arg(long)]
        conversation: Option<String>,
        message: String,
    },
    /// Launch an interactive REPL session.
    Shell {
        #[arg(long, short)]
        user: String,
    },
    /// Inspect or maintain the vector index.
    Index {
        #[command(subcommand)]
        action: IndexCommands,
    },
    /// Show the intents and domains recorded for a user.
    Insights {
        #[arg(long, short)]
        user: String,
    },
    /// Read or change a user's personalization preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsCommands,
    },
    /// Run diagnostic checks.
    Doctor {
        /// Also run the integrity check and report memory usage.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommands {
    /// Vector count and dimension.
    Stats,
    /// Indexed queries of one user, newest first.
    History {
        #[arg(long, short)]
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Remove every vector owned by a user and rewrite the index.
    Purge {
        #[arg(long, short)]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsCommands {
    /// Merge the given fields into the stored preferences.
    Set {
        #[arg(long, short)]
        user: String,
        /// friendly, professional or casual.
        #[arg(long)]
        tone: Option<Tone>,
        /// beginner, intermediate or advanced.
        #[arg(long)]
        expertise: Option<ExpertiseLevel>,
        /// Replaces the derived instructions entirely.
        #[arg(long)]
        instructions: Option<String>,
        /// Repeat to list several preferred domains.
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Print the stored preferences.
    Show {
        #[arg(long, short)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            promptsense_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging.level);

    let json = cli.json;
    let result = match cli.command {
        Some(Commands::Chat {
            user,
            conversation,
            message,
        }) => {
            return match run_chat(&config, &user, conversation.as_deref(), &message, json).await {
                Ok(code) => code,
                Err(e) => report(e),
            };
        }
        Some(Commands::Shell { user }) => shell::run_shell(&config, &user).await,
        Some(Commands::Index { action }) => match action {
            IndexCommands::Stats => inspect::run_index_stats(&config, json).await,
            IndexCommands::History { user, limit } => {
                inspect::run_index_history(&config, &user, limit, json).await
            }
            IndexCommands::Purge { user } => inspect::run_index_purge(&config, &user).await,
        },
        Some(Commands::Insights { user }) => inspect::run_insights(&config, &user, json).await,
        Some(Commands::Prefs { action }) => match action {
            PrefsCommands::Set {
                user,
                tone,
                expertise,
                instructions,
                domains,
            } => {
                let update = UserPreferences {
                    tone,
                    expertise_level: expertise,
                    custom_instructions: instructions,
                    preferred_domains: domains,
                };
                inspect::run_prefs_set(&config, &user, update).await
            }
            PrefsCommands::Show { user } => inspect::run_prefs_show(&config, &user).await,
        },
        Some(Commands::Doctor { deep, plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), deep, plain).await
        }
        None => {
            println!("promptsense: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(e: PromptSenseError) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::FAILURE
}

/// Runs `promptsense chat`. A failed generation still prints the outcome
/// but exits non-zero. The outcome is printed before shutdown so a failed
/// final save cannot hide it.
async fn run_chat(
    config: &PromptSenseConfig,
    user_id: &str,
    conversation_id: Option<&str>,
    message: &str,
    json: bool,
) -> Result<ExitCode, PromptSenseError> {
    let pipeline = runtime::build_pipeline(config).await?;
    pipeline.store().ensure_user(user_id, user_id).await?;
    let rendered = pipeline
        .process_message(user_id, message, conversation_id)
        .await
        .and_then(|outcome| print_outcome(&outcome, json).map(|()| outcome));
    runtime::close_pipeline(&pipeline).await;
    let outcome = rendered?;

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_outcome(outcome: &ChatOutcome, json: bool) -> Result<(), PromptSenseError> {
    if json {
        let rendered = serde_json::to_string_pretty(outcome)
            .map_err(|e| PromptSenseError::Internal(format!("failed to render JSON: {e}")))?;
        println!("{rendered}");
    } else if outcome.success {
        println!("{}", outcome.response);
    } else {
        eprintln!("{}", outcome.response);
        if let Some(detail) = &outcome.error {
            tracing::debug!(error = %detail, "generation failed");
        }
    }
    Ok(())
}
