//! Dedicated cfg codec
//!
//! Line-oriented scan of the flat `key=value` server config. Named blocks are
//! delimited by marker comments: `# Name` opens a block and `# END [Name]`
//! (case-insensitive on END) closes it. Unrecognized lines are skipped, never
//! errors; the caller always gets a best-effort model.

use crate::models::{CfgEntry, CfgItem};

/// Comment token used by both block markers and skipped comment lines
pub const COMMENT_TOKEN: char = '#';

/// Keyword closing a block, matched case-insensitively
pub const END_KEYWORD: &str = "END";

/// Parse cfg text into an ordered item list
///
/// A block that collects zero key/value pairs is discarded entirely. An
/// unclosed block at end of input is treated as closed there, under the same
/// rule.
pub fn parse(text: &str) -> Vec<CfgItem> {
    let mut items = Vec::new();
    let mut open_block: Option<(String, Vec<CfgEntry>)> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = comment_body(trimmed) {
            if let Some((name, entries)) = open_block.take() {
                if is_end_marker(rest) {
                    flush_block(&mut items, name, entries);
                } else {
                    // Comments inside a block do not terminate it
                    open_block = Some((name, entries));
                }
            } else if !rest.is_empty() && !is_end_marker(rest) {
                open_block = Some((rest.to_string(), Vec::new()));
            }
            // Residual comment lines outside any block are skipped
            continue;
        }

        match split_pair(trimmed) {
            Some(entry) => match open_block.as_mut() {
                Some((_, entries)) => entries.push(entry),
                None => items.push(CfgItem::Entry(entry)),
            },
            // Lines without '=' are silently skipped
            None => {}
        }
    }

    if let Some((name, entries)) = open_block {
        flush_block(&mut items, name, entries);
    }

    items
}

/// Serialize an item list back to cfg text
///
/// No escaping is performed: keys or values containing `=` or a newline
/// produce output that the following parse reads differently, and a block
/// name that begins with the END keyword closes itself. Known boundary
/// conditions, covered by tests rather than handled.
pub fn serialize(items: &[CfgItem]) -> String {
    let mut lines = Vec::new();
    for item in items {
        match item {
            CfgItem::Entry(entry) => lines.push(format!("{}={}", entry.key, entry.value)),
            CfgItem::Group(block) => {
                lines.push(format!("# {}", block.name));
                for entry in &block.entries {
                    lines.push(format!("{}={}", entry.key, entry.value));
                }
                lines.push(format!("# END {}", block.name));
            }
        }
    }
    lines.join("\n")
}

/// The text following the comment token, trimmed, when the line is a comment
fn comment_body(line: &str) -> Option<&str> {
    line.strip_prefix(COMMENT_TOKEN).map(str::trim)
}

fn is_end_marker(body: &str) -> bool {
    let first = body.split_whitespace().next().unwrap_or("");
    first.eq_ignore_ascii_case(END_KEYWORD)
}

/// Split a line on the first `=`, trimming both sides
fn split_pair(line: &str) -> Option<CfgEntry> {
    let (key, value) = line.split_once('=')?;
    Some(CfgEntry::new(key.trim(), value.trim()))
}

fn flush_block(items: &mut Vec<CfgItem>, name: String, entries: Vec<CfgEntry>) {
    if !entries.is_empty() {
        items.push(CfgItem::group(name, entries));
    }
}
