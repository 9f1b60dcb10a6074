//! Heuristic format detector
//!
//! Classifies raw text as one of the two supported formats. This is a
//! heuristic, not a grammar check: callers must treat [`FormatKind::Unknown`]
//! as "ask the user", never as a silent default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::privileges::{CONTAINER_ELEMENT, ENTRY_ELEMENT};

/// Number of leading non-blank lines sampled by the heuristic
const SAMPLE_LINES: usize = 40;

/// The formats the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Privileges,
    Cfg,
    Unknown,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Privileges => write!(f, "privileges"),
            FormatKind::Cfg => write!(f, "cfg"),
            FormatKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "privileges" => Ok(FormatKind::Privileges),
            "cfg" => Ok(FormatKind::Cfg),
            _ => Err(format!("Invalid format: {}", s)),
        }
    }
}

/// Guess which format the given text is
pub fn detect(text: &str) -> FormatKind {
    if text.trim().is_empty() {
        return FormatKind::Unknown;
    }

    // XML markers take precedence over any cfg heuristic
    if text.contains("<?xml")
        || text.contains(&format!("<{}", CONTAINER_ELEMENT))
        || text.contains(&format!("<{}", ENTRY_ELEMENT))
    {
        return FormatKind::Privileges;
    }

    let mut eq_count = 0usize;
    let mut xml_like_count = 0usize;
    for line in text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(SAMPLE_LINES)
    {
        if line.contains('=') {
            eq_count += 1;
        }
        if line.starts_with('<') {
            xml_like_count += 1;
        }
    }

    if eq_count >= 1 && xml_like_count == 0 {
        FormatKind::Cfg
    } else if xml_like_count > 0 && eq_count == 0 {
        FormatKind::Privileges
    } else {
        FormatKind::Unknown
    }
}
