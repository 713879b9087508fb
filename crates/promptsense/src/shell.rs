// SPDX-FileCopyrightText: 2026 PromptSense Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `promptsense shell` command implementation.
//!
//! Launches an interactive REPL with a colored prompt and readline history.
//! Each invocation opens a fresh conversation for the user; every line goes
//! through the full personalization pipeline.

use colored::Colorize;
use promptsense_agent::{ChatOutcome, PromptPipeline};
use promptsense_config::PromptSenseConfig;
use promptsense_core::PromptSenseError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::runtime::{build_pipeline, close_pipeline};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Quit,
    NewConversation,
    Title,
    Insights,
    Help,
    Unknown(&'a str),
    Message(&'a str),
    Empty,
}

fn parse_input(line: &str) -> ShellInput<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => ShellInput::Empty,
        "/quit" | "/exit" => ShellInput::Quit,
        "/new" => ShellInput::NewConversation,
        "/title" => ShellInput::Title,
        "/insights" => ShellInput::Insights,
        "/help" => ShellInput::Help,
        cmd if cmd.starts_with('/') => ShellInput::Unknown(cmd),
        text => ShellInput::Message(text),
    }
}

/// Runs the `promptsense shell` interactive REPL.
pub async fn run_shell(config: &PromptSenseConfig, user_id: &str) -> Result<(), PromptSenseError> {
    let pipeline = build_pipeline(config).await?;
    pipeline.store().ensure_user(user_id, user_id).await?;
    let mut conversation_id = pipeline.store().create_conversation(user_id, None).await?.id;
    let mut titled = false;

    let mut rl = DefaultEditor::new()
        .map_err(|e| PromptSenseError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "promptsense shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", user_id.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => match parse_input(&line) {
                ShellInput::Empty => continue,
                ShellInput::Quit => break,
                ShellInput::Help => print_help(),
                ShellInput::Unknown(cmd) => {
                    eprintln!("{}: unknown command {cmd}", "error".red());
                }
                ShellInput::NewConversation => {
                    match pipeline.store().create_conversation(user_id, None).await {
                        Ok(conversation) => {
                            conversation_id = conversation.id;
                            titled = false;
                            println!("{}", "started a new conversation".dimmed());
                        }
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    }
                }
                ShellInput::Title => match pipeline.generate_title(&conversation_id).await {
                    Ok(title) => {
                        titled = true;
                        println!("{} {title}", "title:".dimmed());
                    }
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                },
                ShellInput::Insights => match pipeline.insights(user_id).await {
                    Ok(insights) => print!("{}", crate::inspect::format_insights(user_id, &insights, true)),
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                },
                ShellInput::Message(text) => {
                    let _ = rl.add_history_entry(&line);
                    match pipeline
                        .process_message(user_id, text, Some(&conversation_id))
                        .await
                    {
                        Ok(outcome) => {
                            print_outcome(&outcome);
                            if outcome.success && !titled {
                                titled = auto_title(&pipeline, &conversation_id).await;
                            }
                        }
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    }
                }
            },
            // Ctrl+C or Ctrl+D
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    close_pipeline(&pipeline).await;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn auto_title(pipeline: &PromptPipeline, conversation_id: &str) -> bool {
    match pipeline.generate_title(conversation_id).await {
        Ok(title) => {
            debug!(conversation_id, title = %title, "conversation titled");
            true
        }
        Err(e) => {
            warn!(conversation_id, error = %e, "automatic title failed");
            false
        }
    }
}

fn print_outcome(outcome: &ChatOutcome) {
    if outcome.success {
        println!("{}", outcome.response);
    } else {
        eprintln!("{}", outcome.response.yellow());
    }
    println!("{}\n", meta_line(outcome).dimmed());
}

fn meta_line(outcome: &ChatOutcome) -> String {
    let mut meta = format!(
        "[{} / {}] similar: {}",
        outcome.intent, outcome.domain, outcome.similar_queries
    );
    if outcome.context_used {
        meta.push_str(" | context used");
    }
    if outcome.refined_query.is_some() {
        meta.push_str(" | refined");
    }
    meta
}

fn print_help() {
    println!("  /new       start a new conversation");
    println!("  /title     name the current conversation");
    println!("  /insights  show what has been learned about you");
    println!("  /quit      exit the shell");
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptsense_core::types::{Domain, Intent};

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(parse_input("  /quit "), ShellInput::Quit);
        assert_eq!(parse_input("/exit"), ShellInput::Quit);
        assert_eq!(parse_input("/new"), ShellInput::NewConversation);
        assert_eq!(parse_input("/bogus"), ShellInput::Unknown("/bogus"));
        assert_eq!(parse_input("   "), ShellInput::Empty);
        assert_eq!(parse_input(" hello there "), ShellInput::Message("hello there"));
    }

    #[test]
    fn meta_line_flags() {
        let outcome = ChatOutcome {
            success: true,
            response: "ok".into(),
            error: None,
            intent: Intent::Learning,
            domain: Domain::Technology,
            similar_queries: 2,
            context_used: true,
            refined_query: Some("refined".into()),
            user_message_id: None,
            assistant_message_id: None,
            enhanced_prompt: String::new(),
        };
        assert_eq!(
            meta_line(&outcome),
            "[learning / technology] similar: 2 | context used | refined"
        );
    }
}
