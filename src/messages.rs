//! Loader for the canned reply messages.
//!
//! The messages file holds one message per line. Blank lines and lines
//! starting with `//` are skipped.

use log::{debug, info};
use std::fs;
use std::path::Path;

use crate::error::{BotError, BotResult};

/// Prefix marking a comment line in the messages file.
pub const COMMENT_MARKER: &str = "//";

/// Reads the messages file at `path`.
///
/// # Returns
///
/// - `Ok(Vec<String>)`: The trimmed, non-empty, non-comment lines in file order
/// - `Err(BotError::Io)`: If the file cannot be read (no default content is synthesized)
pub fn load_messages(path: &Path) -> BotResult<Vec<String>> {
    info!("Loading reply messages from {}", path.display());

    let content = fs::read_to_string(path).map_err(|e| BotError::io(path, e))?;
    let messages = parse_messages(&content);

    debug!("Loaded {} reply messages", messages.len());
    Ok(messages)
}

/// Extracts messages from the raw file content.
pub fn parse_messages(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(str::to_string)
        .collect()
}
