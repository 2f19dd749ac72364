//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Ctrl-C while a turn is running cancels the turn after the current tool
//! round; Ctrl-C at the prompt exits.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use browsebot_agent::{AgentError, AgentLoop};

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// What a line of input asks for.
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Exit,
    Reset,
    Tools,
    Message(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    let lower = input.to_lowercase();
    if EXIT_COMMANDS.contains(&lower.as_str()) {
        Command::Exit
    } else if lower == "/reset" {
        Command::Reset
    } else if lower == "/tools" {
        Command::Tools
    } else {
        Command::Message(input)
    }
}

/// Run the interactive REPL loop.
pub async fn run(agent: &mut AgentLoop) -> Result<()> {
    helpers::print_banner(agent.model());
    helpers::print_tools(agent.registry());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&input);

        match parse_command(trimmed) {
            Command::Exit => {
                println!("\nGoodbye!");
                break;
            }
            Command::Reset => {
                agent.reset();
                helpers::print_notice("conversation cleared");
            }
            Command::Tools => helpers::print_tools(agent.registry()),
            Command::Message(text) => run_turn(agent, text).await,
        }
    }

    save_history(&mut editor);
    Ok(())
}

/// Run one turn, cancelling it on Ctrl-C.
async fn run_turn(agent: &mut AgentLoop, text: &str) {
    debug!(input = text, "processing input");

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    helpers::print_thinking();
    let result = agent.run_turn(text, &cancel).await;
    watcher.abort();
    helpers::clear_thinking();

    match result {
        Ok(outcome) => {
            debug!(
                model_calls = outcome.model_calls,
                tool_calls = outcome.tool_calls,
                "turn complete"
            );
            helpers::print_response(&outcome.answer);
        }
        Err(AgentError::Cancelled { .. }) => helpers::print_notice("turn cancelled"),
        Err(e) => helpers::print_error(&e),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

fn history_path() -> std::path::PathBuf {
    browsebot_core::utils::get_history_path().join("cli_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert_eq!(parse_command("exit"), Command::Exit);
        assert_eq!(parse_command("EXIT"), Command::Exit);
        assert_eq!(parse_command("/quit"), Command::Exit);
        assert_eq!(parse_command(":q"), Command::Exit);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_command("/reset"), Command::Reset);
        assert_eq!(parse_command("/Tools"), Command::Tools);
    }

    #[test]
    fn everything_else_is_a_message() {
        assert_eq!(
            parse_command("open example.com"),
            Command::Message("open example.com")
        );
        assert_eq!(parse_command("/unknown"), Command::Message("/unknown"));
    }

    #[test]
    fn history_path_under_data_dir() {
        let path = history_path();
        assert!(path.to_string_lossy().contains(".browsebot"));
        assert!(path.ends_with("history/cli_history"));
    }
}
