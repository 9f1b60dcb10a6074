//! Duplicate-key validation for the cfg model
//!
//! A key may appear at most once across the whole document; the mapping spans
//! flat entries and block entries uniformly, so a key inside a block collides
//! with the same key at top level. Callers gate export on the report and
//! render inline indicators from the per-entry `duplicate` flags.

use crate::models::CfgItem;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of a duplicate-key pass
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DuplicateReport {
    /// Whether any key collision exists
    pub has_duplicates: bool,

    /// Sorted list of the colliding keys
    pub keys: Vec<String>,
}

/// Recompute every `duplicate` flag in place and report collisions
///
/// A non-empty trimmed key occurring more than once marks every occurrence;
/// a key occurring exactly once is cleared. Empty keys are exempt and always
/// cleared.
pub fn validate(items: &mut [CfgItem]) -> DuplicateReport {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items.iter() {
        match item {
            CfgItem::Entry(entry) => bump(&mut counts, &entry.key),
            CfgItem::Group(block) => {
                for entry in &block.entries {
                    bump(&mut counts, &entry.key);
                }
            }
        }
    }

    for item in items.iter_mut() {
        match item {
            CfgItem::Entry(entry) => {
                entry.duplicate = is_duplicate(&counts, &entry.key);
            }
            CfgItem::Group(block) => {
                for entry in &mut block.entries {
                    entry.duplicate = is_duplicate(&counts, &entry.key);
                }
            }
        }
    }

    let mut keys: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect();
    keys.sort();

    if !keys.is_empty() {
        debug!(duplicates = keys.len(), "duplicate cfg keys detected");
    }

    DuplicateReport {
        has_duplicates: !keys.is_empty(),
        keys,
    }
}

fn bump(counts: &mut HashMap<String, usize>, key: &str) {
    let trimmed = key.trim();
    if !trimmed.is_empty() {
        *counts.entry(trimmed.to_string()).or_insert(0) += 1;
    }
}

fn is_duplicate(counts: &HashMap<String, usize>, key: &str) -> bool {
    let trimmed = key.trim();
    !trimmed.is_empty() && counts.get(trimmed).copied().unwrap_or(0) > 1
}
