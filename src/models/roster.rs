//! Roster model for the privileges format
//!
//! A roster is an ordered list of groups, each labeled by a comment string and
//! holding the access-control entries that follow that comment in the XML.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Group label used for entries that precede the first comment in the XML
pub const IMPLICIT_GROUP_LABEL: &str = "Default";

/// Group label for the fallback roster returned when no container is found
pub const FALLBACK_GROUP_LABEL: &str = "All";

/// A named collection of access-control entries, labeled by a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Comment string emitted as a standalone `<!-- ... -->` before the entries
    pub comment: String,

    /// Ordered entries; order is preserved on round-trip
    pub entries: Vec<Entry>,
}

impl Group {
    /// Create an empty group with the given label
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            entries: Vec::new(),
        }
    }

    /// The single-group fallback roster used when parsing finds no container
    pub fn fallback_roster() -> Vec<Group> {
        vec![Group::new(FALLBACK_GROUP_LABEL)]
    }
}

/// One access-control record
///
/// `valid`, `avatar`, and `loading` are derived resolution state and are never
/// written to the serialized format. `slot` is a stable identity generated at
/// construction; the resolution pipeline keys its outstanding-request table on
/// it so that structural edits (row removal, reordering) can never misroute a
/// stale completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Stable identity, independent of array position; never serialized
    #[serde(skip, default = "Uuid::new_v4")]
    pub slot: Uuid,

    /// Identifier; expected to be a 17-digit SteamID64 once resolved
    pub id: String,

    /// Display name
    pub name: String,

    /// Color-display flag, `"0"` or `"1"`
    pub show_colors: String,

    /// Avatar URL reported by the directory, if any
    pub avatar: Option<String>,

    /// `Some(true)`/`Some(false)` once resolved, `None` while unresolved
    pub valid: Option<bool>,

    /// A directory lookup is in flight for this entry
    pub loading: bool,
}

/// Structural equality; `slot` is infrastructure identity and is excluded
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.show_colors == other.show_colors
            && self.avatar == other.avatar
            && self.valid == other.valid
            && self.loading == other.loading
    }
}

impl Entry {
    /// Create an entry with the given attributes and idle resolution state
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        show_colors: impl Into<String>,
    ) -> Self {
        Self {
            slot: Uuid::new_v4(),
            id: id.into(),
            name: name.into(),
            show_colors: show_colors.into(),
            avatar: None,
            valid: None,
            loading: false,
        }
    }

    /// Create a blank entry the way the editor's "add line" action does
    pub fn blank() -> Self {
        Self::new("", "", "1")
    }

    /// Enter the loading state. An entry is never reported valid or invalid
    /// mid-resolution, so `valid` is cleared here.
    pub fn begin_loading(&mut self) {
        self.loading = true;
        self.valid = None;
    }

    /// Commit a resolution outcome and leave the loading state
    pub fn commit(&mut self, valid: bool, avatar: Option<String>, name: Option<String>) {
        self.loading = false;
        self.valid = Some(valid);
        self.avatar = avatar;
        if let Some(name) = name {
            if self.name.is_empty() {
                self.name = name;
            }
        }
    }

    /// Return to the idle state, discarding any derived resolution data
    pub fn reset_resolution(&mut self) {
        self.loading = false;
        self.valid = None;
        self.avatar = None;
    }

    /// Whether the identifier currently has the canonical 17-digit shape
    pub fn has_canonical_id(&self) -> bool {
        canonical_id_pattern().is_match(&self.id)
    }
}

/// Regex for the canonical fixed-length numeric identifier shape
pub fn canonical_id_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^\d{17}$").expect("valid regex"))
}

/// Regex recognizing Steam profile URL and vanity shapes
pub fn profile_url_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"(?i)steamcommunity\.com|steam://|/id/|/profiles/")
            .expect("valid regex")
    })
}
