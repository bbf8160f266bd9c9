//! Prompt parsing
//!
//! A batch prompt is free text describing the items drawn on the sheet. Item
//! names are the bulleted lines; everything else is ignored. The order of the
//! returned names is the priority order used for fallback naming.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Error reading a prompt file
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PromptError {
    /// Prompt file could not be read
    #[error("Failed to read prompt '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `1. name` and `1) name`
static NUMBERED: OnceLock<Regex> = OnceLock::new();
/// `- name` and `* name`
static BULLETED: OnceLock<Regex> = OnceLock::new();
/// Trailing parenthesized note, `Bed (with rails)`
static ANNOTATION: OnceLock<Regex> = OnceLock::new();

fn numbered() -> &'static Regex {
    NUMBERED.get_or_init(|| Regex::new(r"^\d+[.)]\s*(.+)$").expect("numbered bullet pattern"))
}

fn bulleted() -> &'static Regex {
    BULLETED.get_or_init(|| Regex::new(r"^[-*]\s*(.+)$").expect("dash bullet pattern"))
}

fn annotation() -> &'static Regex {
    ANNOTATION.get_or_init(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("annotation pattern"))
}

/// Parse prompt text into an ordered list of item names.
///
/// Recognizes `1. name`, `1) name`, `- name` and `* name`; a trailing
/// parenthesized note (`- Bed (with rails)`) is removed. Duplicates are kept.
/// Lines that are not bullets are skipped. A bullet holding only a note
/// yields an empty name so later names keep their positions.
pub fn parse_prompt(text: &str) -> Vec<String> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let captured = numbered()
        .captures(line)
        .or_else(|| bulleted().captures(line))
        .and_then(|caps| caps.get(1))?;

    let name = annotation().replace(captured.as_str().trim(), "");
    Some(name.trim().to_string())
}

/// Read a prompt file and parse its item names.
pub fn read_prompt(path: &Path) -> Result<Vec<String>, PromptError> {
    let text = fs::read_to_string(path)
        .map_err(|source| PromptError::Io { path: path.display().to_string(), source })?;
    Ok(parse_prompt(&text))
}
