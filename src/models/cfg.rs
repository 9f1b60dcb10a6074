//! Cfg model for the flat key/value dedicated-server format
//!
//! The document is an ordered sequence of items: standalone `key=value` pairs
//! and named blocks of pairs delimited by `# Name` / `# END Name` marker
//! comments. `duplicate` flags are derived by the duplicate-key validator and
//! recomputed on every mutation; they are never user-set.

use serde::{Deserialize, Serialize};

/// One item of a cfg document, in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CfgItem {
    /// A standalone `key=value` line outside any block
    Entry(CfgEntry),
    /// A named block of `key=value` lines delimited by marker comments
    Group(CfgBlock),
}

/// A single `key=value` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgEntry {
    pub key: String,
    pub value: String,

    /// Derived collision flag, owned by the duplicate-key validator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// A named collection of pairs delimited by start/end marker comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfgBlock {
    pub name: String,
    pub entries: Vec<CfgEntry>,
}

impl CfgEntry {
    /// Create a pair with the collision flag cleared
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            duplicate: false,
        }
    }
}

impl CfgBlock {
    pub fn new(name: impl Into<String>, entries: Vec<CfgEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

impl CfgItem {
    /// Shorthand for a standalone pair item
    pub fn entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        CfgItem::Entry(CfgEntry::new(key, value))
    }

    /// Shorthand for a block item
    pub fn group(name: impl Into<String>, entries: Vec<CfgEntry>) -> Self {
        CfgItem::Group(CfgBlock::new(name, entries))
    }
}
