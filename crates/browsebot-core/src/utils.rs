//! Utility helpers: path resolution and string truncation.

use std::path::PathBuf;

/// Marker appended to tool output cut at the size limit.
pub const OUTPUT_TRUNCATED_MARKER: &str = "\n...(output truncated)...";

/// Characters kept in single-line log previews.
pub const LOG_PREVIEW_LIMIT: usize = 200;

/// Get the Browsebot data directory (e.g. `~/.browsebot/`).
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".browsebot")
}

/// Get the REPL history directory (e.g. `~/.browsebot/history/`).
pub fn get_history_path() -> PathBuf {
    get_data_path().join("history")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Cut tool output to `limit` characters and append [`OUTPUT_TRUNCATED_MARKER`].
pub fn truncate_output(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str(OUTPUT_TRUNCATED_MARKER);
    out
}

/// Single-line preview of `text` for logs, at most `limit` characters
/// before the `...(truncated)...` suffix.
pub fn preview(text: &str, limit: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    let flat = flat.trim();
    if flat.chars().count() <= limit {
        return flat.to_string();
    }
    let head: String = flat.chars().take(limit).collect();
    format!("{head}...(truncated)...")
}
