//! Browsebot CLI: entry point.
//!
//! # Commands
//!
//! - `browsebot agent [-m MESSAGE] [--config PATH] [--logs]`: single-shot or REPL
//! - `browsebot tools [--config PATH]`: connect the tool servers and list their tools
//! - `browsebot init [--force]`: write the default config file

mod helpers;
mod init;
mod repl;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use browsebot_agent::{init_registry, AgentLoop, RegistryInit, ToolRegistry};
use browsebot_core::config::{load_config, Config};
use browsebot_providers::http_provider::create_provider;
use browsebot_providers::LlmProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Browsebot: a local LLM that browses the web through MCP tools
#[derive(Parser)]
#[command(name = "browsebot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Agent {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Config file (default: ~/.browsebot/config.json)
        #[arg(long)]
        config: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Connect the configured tool servers and list their tools
    Tools {
        /// Config file (default: ~/.browsebot/config.json)
        #[arg(long)]
        config: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Where to write it (default: ~/.browsebot/config.json)
        #[arg(long)]
        config: Option<String>,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Agent {
            message,
            config,
            logs,
        } => {
            init_logging(logs);
            run_agent(message, config_path(config)).await
        }
        Commands::Tools { config, logs } => {
            init_logging(logs);
            run_tools(config_path(config)).await
        }
        Commands::Init { force, config } => init::run(config_path(config), force),
    }
}

fn config_path(arg: Option<String>) -> Option<PathBuf> {
    arg.map(|p| helpers::expand_tilde(&p))
}

// ─────────────────────────────────────────────
// Agent command
// ─────────────────────────────────────────────

async fn run_agent(message: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref());
    let interrupt = interrupt_on_ctrl_c();

    // Dropping the pending connections kills any child already spawned.
    let Some(registry) = until_interrupted(&interrupt, connect_tools(&config)).await else {
        return Ok(());
    };
    run_session(&config, registry, message, &interrupt).await
}

/// Drive the agent, then shut the providers down whatever the outcome.
async fn run_session(
    config: &Config,
    registry: Arc<ToolRegistry>,
    message: Option<String>,
    interrupt: &CancellationToken,
) -> Result<()> {
    let result = drive_agent(config, registry.clone(), message, interrupt).await;
    registry.shutdown().await;
    result
}

async fn drive_agent(
    config: &Config,
    registry: Arc<ToolRegistry>,
    message: Option<String>,
    interrupt: &CancellationToken,
) -> Result<()> {
    let mut agent = build_agent_loop(config, registry)?;

    match message {
        Some(msg) => {
            info!("processing single message");
            let Some(answer) = until_interrupted(interrupt, agent.run_once(&msg)).await else {
                return Ok(());
            };
            let answer = answer.context("agent processing failed")?;
            helpers::print_response(&answer);
        }
        // The REPL turns Ctrl-C into turn cancellation itself.
        None => repl::run(&mut agent).await?,
    }
    Ok(())
}

/// Build an `AgentLoop` from the loaded configuration.
fn build_agent_loop(config: &Config, registry: Arc<ToolRegistry>) -> Result<AgentLoop> {
    let provider = create_provider(&config.llm, &config.agent.model)
        .context("failed to create LLM client")?;
    info!(
        llm = provider.display_name(),
        model = %config.agent.model,
        "LLM client ready"
    );

    Ok(AgentLoop::new(Arc::new(provider), registry, &config.agent))
}

/// Start every enabled tool server and report what came up.
async fn connect_tools(config: &Config) -> Arc<ToolRegistry> {
    let servers = config.enabled_servers();
    if !servers.is_empty() {
        helpers::print_connecting(&servers);
    }

    let init: RegistryInit = init_registry(&servers, config.tools.collision_policy).await;
    helpers::print_startup_problems(&init);
    Arc::new(init.registry)
}

// ─────────────────────────────────────────────
// Tools command
// ─────────────────────────────────────────────

async fn run_tools(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref());
    let interrupt = interrupt_on_ctrl_c();

    let Some(registry) = until_interrupted(&interrupt, connect_tools(&config)).await else {
        return Ok(());
    };
    helpers::print_tools(&registry);
    registry.shutdown().await;
    Ok(())
}

// ─────────────────────────────────────────────
// Interrupts
// ─────────────────────────────────────────────

/// A token cancelled on the first Ctrl-C.
fn interrupt_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

/// Run `work` unless `interrupt` fires first.
async fn until_interrupted<F: Future>(interrupt: &CancellationToken, work: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = interrupt.cancelled() => {
            println!();
            println!("  Shutting down...");
            info!("received Ctrl+C, shutting down");
            None
        }
        out = work => Some(out),
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("browsebot=debug,info"),
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
