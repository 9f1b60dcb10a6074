//! Privileges XML codec
//!
//! Parses the server's access-control XML into an ordered roster of groups and
//! serializes a roster back into the fixed document skeleton the server
//! expects. Comments that own a whole line label the group that follows them;
//! a comment trailing other content on the same line has no position the
//! schema could re-emit it at, so it is stripped before parsing.

use crate::models::{Entry, Group};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::sync::OnceLock;
use tracing::debug;

/// Root element of the privileges document
pub const ROOT_ELEMENT: &str = "Privileges";

/// Privilege scope element and its fixed name attribute
pub const SCOPE_ELEMENT: &str = "Privilege";
pub const SCOPE_NAME: &str = "Administrator";

/// Identity-list container element
pub const CONTAINER_ELEMENT: &str = "SteamIDs";

/// Identifier element carrying the `id`, `showColors`, `name` attributes
pub const ENTRY_ELEMENT: &str = "SteamID";

/// Command names emitted verbatim on every serialize. This is a fixed product
/// constant, not derived from input.
pub const DEFAULT_COMMANDS: [&str; 11] = [
    "Lobby.Kick.RichId",
    "Chat.SystemMessage",
    "Online.Server.Password",
    "sv_servername",
    "Ban.User.SteamID",
    "Admin.ShowAdminStatus",
    "weather.stormfactor.setnewtarget",
    "e_timeofday",
    "game.skirmish.setnextarea",
    "game.skirmish.forceendround",
    "g_teamSizeMaxUserPercentageDifference",
];

fn comment_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"<!--.*?-->").expect("valid regex"))
}

/// Parse privileges XML into a roster
///
/// Never fails: input that cannot be parsed as the expected structure, or that
/// lacks the identity-list container, yields the single fallback group.
pub fn parse(text: &str) -> Vec<Group> {
    let cleaned = strip_inline_comments(text);
    match scan_container(&cleaned) {
        Some(groups) => groups,
        None => {
            debug!("no identity-list container found, returning fallback roster");
            Group::fallback_roster()
        }
    }
}

/// Remove comments sharing a line with other content, keeping comments that
/// own their whole line
fn strip_inline_comments(text: &str) -> String {
    let pattern = comment_pattern();
    text.lines()
        .map(|line| {
            if !pattern.is_match(line) {
                return line.to_string();
            }
            let without = pattern.replace_all(line, "");
            if without.trim().is_empty() {
                line.to_string()
            } else {
                without.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Event scan over the first identity-list container. Returns `None` when the
/// document is malformed or has no container.
fn scan_container(text: &str) -> Option<Vec<Group>> {
    let mut reader = Reader::from_str(text);
    let mut groups = Vec::new();
    let mut current = Group::new(crate::models::IMPLICIT_GROUP_LABEL);
    let mut in_container = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if !in_container => {
                if e.local_name().as_ref() == CONTAINER_ELEMENT.as_bytes() {
                    in_container = true;
                }
            }
            Ok(Event::Comment(e)) if in_container => {
                let label = String::from_utf8_lossy(e.as_ref()).trim().to_string();
                let implicit_and_empty = current.entries.is_empty()
                    && current.comment == crate::models::IMPLICIT_GROUP_LABEL;
                if !implicit_and_empty {
                    groups.push(current);
                }
                current = Group::new(label);
            }
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if in_container && e.local_name().as_ref() == ENTRY_ELEMENT.as_bytes() =>
            {
                let mut id = String::new();
                let mut name = String::new();
                let mut show_colors = "0".to_string();
                for attr in e.attributes() {
                    let attr = attr.ok()?;
                    let value = attr.unescape_value().ok()?.into_owned();
                    match attr.key.as_ref() {
                        b"id" => id = value.trim().to_string(),
                        b"name" => name = value,
                        b"showColors" => show_colors = value,
                        _ => {}
                    }
                }
                current.entries.push(Entry::new(id, name, show_colors));
            }
            Ok(Event::End(e)) if in_container => {
                if e.local_name().as_ref() == CONTAINER_ELEMENT.as_bytes() {
                    // Terminal group is always flushed
                    groups.push(current);
                    return Some(groups);
                }
            }
            Ok(Event::Eof) => {
                if in_container {
                    groups.push(current);
                    return Some(groups);
                }
                return None;
            }
            Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Serialize a roster into the fixed privileges document skeleton
///
/// Entries with an empty `id` are emitted unfiltered; deciding whether they
/// belong in the document is the caller's responsibility.
pub fn serialize(groups: &[Group]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<{}>\n    <{} Name=\"{}\">\n        <{}>\n",
        ROOT_ELEMENT, SCOPE_ELEMENT, SCOPE_NAME, CONTAINER_ELEMENT
    ));
    for group in groups {
        if !group.comment.is_empty() {
            out.push_str(&format!("            <!-- {} -->\n", group.comment));
        }
        for entry in &group.entries {
            let show = if entry.show_colors.is_empty() {
                "1"
            } else {
                entry.show_colors.as_str()
            };
            out.push_str(&format!(
                "\t\t\t<{} id=\"{}\" showColors=\"{}\" name=\"{}\"/>\n",
                ENTRY_ELEMENT,
                escape_attr(&entry.id),
                escape_attr(show),
                escape_attr(&entry.name),
            ));
        }
    }
    out.push_str(&format!(
        "        </{}>\n        <Commands bHasPrevious=\"true\">\n",
        CONTAINER_ELEMENT
    ));
    for command in DEFAULT_COMMANDS {
        out.push_str(&format!("            <Command Name=\"{}\"/>\n", command));
    }
    out.push_str(&format!(
        "        </Commands>\n    </{}>\n</{}>\n",
        SCOPE_ELEMENT, ROOT_ELEMENT
    ));
    out
}

/// Escape attribute values; the target consumer only requires double quotes
/// to be entity-encoded
fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}
