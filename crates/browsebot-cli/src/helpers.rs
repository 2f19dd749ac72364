//! Shared CLI helpers: path expansion and terminal output.

use std::fmt::Display;
use std::path::PathBuf;

use colored::Colorize;

use browsebot_agent::{RegistryInit, ToolRegistry};
use browsebot_core::config::McpServerConfig;
use browsebot_core::utils::truncate_string;

/// Width of tool descriptions in the `/tools` listing.
const DESCRIPTION_WIDTH: usize = 72;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "Browsebot".cyan().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

pub fn print_error(error: &dyn Display) {
    eprintln!("\n{} {error}\n", "Error:".red().bold());
}

pub fn print_notice(text: &str) {
    println!("{}", format!("({text})").dimmed());
}

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "Browsebot".cyan().bold(),
        version.dimmed(),
        format!("model: {model}").dimmed()
    );
    println!(
        "{}",
        "Type a message, /tools, /reset, or \"exit\" to quit.".dimmed()
    );
    println!();
}

pub fn print_connecting(servers: &[McpServerConfig]) {
    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    eprintln!(
        "{}",
        format!("connecting tool servers: {}", names.join(", ")).dimmed()
    );
}

/// Report servers that failed to start and tools dropped as duplicates.
pub fn print_startup_problems(init: &RegistryInit) {
    for failure in &init.failures {
        eprintln!(
            "  {} {} unavailable: {}",
            "✗".red(),
            failure.provider.bold(),
            failure.reason
        );
    }
    for duplicate in init.duplicates() {
        eprintln!("  {} {duplicate}", "!".yellow());
    }
}

/// List every tool the model can currently call, grouped by provider.
pub fn print_tools(registry: &ToolRegistry) {
    if registry.is_empty() {
        println!("{}", "No tools available.".yellow());
        println!();
        return;
    }

    println!("{}", format!("{} tools available", registry.len()).bold());
    for provider in registry.provider_names() {
        let tools: Vec<_> = registry
            .catalog()
            .into_iter()
            .filter(|t| t.owner == provider)
            .collect();
        if tools.is_empty() {
            continue;
        }
        println!("  {} {}", "✓".green(), provider.bold());
        for tool in tools {
            println!(
                "      {}  {}",
                tool.name.cyan(),
                truncate_string(first_line(&tool.description), DESCRIPTION_WIDTH).dimmed()
            );
        }
    }
    println!();
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Print a "thinking" placeholder.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
