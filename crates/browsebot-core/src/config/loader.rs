//! Config loader: reads `~/.browsebot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.browsebot/config.json`
//! 3. Plain `MODEL_NAME`, `BASE_URL`, `API_KEY`
//! 4. Environment variables `BROWSEBOT_<SECTION>__<FIELD>`

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given or default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = read_config_file(&config_path);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Read and parse a config file, or return defaults.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` resolves a variable name to its value. Supported overrides:
/// - `MODEL_NAME`, `BASE_URL`, `API_KEY` (plain, lower precedence)
/// - `BROWSEBOT_AGENT__MODEL`, `BROWSEBOT_AGENT__MAX_TOKENS`,
///   `BROWSEBOT_AGENT__TEMPERATURE`, `BROWSEBOT_AGENT__MAX_TOOL_ROUNDS`,
///   `BROWSEBOT_AGENT__TOOL_TIMEOUT_SECS`, `BROWSEBOT_AGENT__MAX_TOOL_OUTPUT_CHARS`,
///   `BROWSEBOT_AGENT__SYSTEM_PROMPT`
/// - `BROWSEBOT_LLM__API_BASE`, `BROWSEBOT_LLM__API_KEY`
/// - `BROWSEBOT_TOOLS__COLLISION_POLICY`
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // Plain variables first so the prefixed ones win.
    if let Some(val) = lookup("MODEL_NAME") {
        config.agent.model = val;
    }
    if let Some(val) = lookup("BASE_URL") {
        config.llm.api_base = val;
    }
    if let Some(val) = lookup("API_KEY") {
        config.llm.api_key = val;
    }

    // Agent
    if let Some(val) = lookup("BROWSEBOT_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Some(n) = parse_var(&lookup, "BROWSEBOT_AGENT__MAX_TOKENS") {
        config.agent.max_tokens = n;
    }
    if let Some(t) = parse_var(&lookup, "BROWSEBOT_AGENT__TEMPERATURE") {
        config.agent.temperature = t;
    }
    if let Some(n) = parse_var(&lookup, "BROWSEBOT_AGENT__MAX_TOOL_ROUNDS") {
        config.agent.max_tool_rounds = n;
    }
    if let Some(n) = parse_var(&lookup, "BROWSEBOT_AGENT__TOOL_TIMEOUT_SECS") {
        config.agent.tool_timeout_secs = n;
    }
    if let Some(n) = parse_var(&lookup, "BROWSEBOT_AGENT__MAX_TOOL_OUTPUT_CHARS") {
        config.agent.max_tool_output_chars = n;
    }
    if let Some(val) = lookup("BROWSEBOT_AGENT__SYSTEM_PROMPT") {
        config.agent.system_prompt = val;
    }

    // LLM endpoint
    if let Some(val) = lookup("BROWSEBOT_LLM__API_BASE") {
        config.llm.api_base = val;
    }
    if let Some(val) = lookup("BROWSEBOT_LLM__API_KEY") {
        config.llm.api_key = val;
    }

    // Tools
    if let Some(policy) = parse_var(&lookup, "BROWSEBOT_TOOLS__COLLISION_POLICY") {
        config.tools.collision_policy = policy;
    }

    config
}

/// Look up and parse a variable, warning on unparseable values.
fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
