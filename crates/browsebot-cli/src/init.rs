//! `browsebot init`: write the default configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use browsebot_core::config::{get_config_path, save_config, Config};
use browsebot_core::utils::get_history_path;

/// What `init` did with the config file.
#[derive(Debug, PartialEq)]
enum ConfigWrite {
    Created,
    Overwritten,
    Kept,
}

/// Run the init command.
pub fn run(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = config_path.unwrap_or_else(get_config_path);

    println!();
    println!("{}", "Browsebot setup".cyan().bold());
    println!();

    match write_default_config(&path, force)? {
        ConfigWrite::Created => {
            println!("  {} created config at {}", "✓".green(), path.display())
        }
        ConfigWrite::Overwritten => {
            println!("  {} reset config at {}", "✓".green(), path.display())
        }
        ConfigWrite::Kept => println!(
            "  {} config already exists at {} (use --force to overwrite)",
            "✓".green(),
            path.display()
        ),
    }

    let history = get_history_path();
    std::fs::create_dir_all(&history)
        .with_context(|| format!("failed to create {}", history.display()))?;
    println!("  {} history at {}", "✓".green(), history.display());

    println!();
    println!(
        "{}",
        "Point llm.apiBase at an OpenAI-compatible server, then run `browsebot agent`.".dimmed()
    );
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> Result<ConfigWrite> {
    let existed = path.exists();
    if existed && !force {
        return Ok(ConfigWrite::Kept);
    }

    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(if existed {
        ConfigWrite::Overwritten
    } else {
        ConfigWrite::Created
    })
}
