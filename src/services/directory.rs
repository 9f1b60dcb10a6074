//! Identity directory: the external collaborator resolving identifiers
//!
//! The engine only depends on the [`IdentityDirectory`] trait; `None` from any
//! lookup signals failure and is treated by all callers exactly like an
//! invalid result. [`SteamDirectory`] is the production implementation backed
//! by the Steam community endpoints.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Directory response for one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    pub valid: bool,
    pub avatar: Option<String>,
    pub name: Option<String>,
}

impl IdentityRecord {
    /// The record used for identifiers the directory could not confirm
    pub fn invalid(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            valid: false,
            avatar: None,
            name: None,
        }
    }
}

/// Result of resolving a profile URL or vanity alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    /// The canonical 17-digit identifier
    pub canonical_id: String,
    pub avatar: Option<String>,
    pub name: Option<String>,
}

/// External lookup capability consumed by the resolution pipeline
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Single lookup; `None` signals lookup failure
    async fn validate_identity(&self, id: &str) -> Option<IdentityRecord>;

    /// Batch lookup; the result list may omit ids that were not found
    async fn validate_identities(&self, ids: &[String]) -> Option<Vec<IdentityRecord>>;

    /// Resolve a profile URL or vanity alias to a canonical identifier
    async fn resolve_profile(&self, reference: &str) -> Option<ResolvedProfile>;
}

/// Request timeout applied to every Steam call
const STEAM_TIMEOUT: Duration = Duration::from_secs(8);

fn profile_path_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"/id/([^/]+)|/profiles/(\d+)").expect("valid regex")
    })
}

/// Steam-community-backed directory
///
/// Identity validation fetches the public profile XML; an identifier is
/// considered valid when the profile reports an avatar. Vanity resolution
/// needs a Steam Web API key (`STEAM_API_KEY`).
#[derive(Clone)]
pub struct SteamDirectory {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SteamDirectory {
    pub fn new(api_key: Option<String>) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(STEAM_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }

    /// Build a directory taking the API key from `STEAM_API_KEY`
    pub fn from_env() -> crate::Result<Self> {
        Self::new(std::env::var("STEAM_API_KEY").ok())
    }

    async fn fetch_profile(&self, id: &str) -> Option<SteamProfile> {
        let url = format!("https://steamcommunity.com/profiles/{}/?xml=1", id);
        let response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(id, status = %response.status(), "profile fetch rejected");
                return None;
            }
            Err(err) => {
                warn!(id, error = %err, "profile fetch failed");
                return None;
            }
        };
        let text = response.text().await.ok()?;
        parse_profile_xml(&text)
    }

    async fn resolve_vanity(&self, vanity: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("vanity resolution requires STEAM_API_KEY");
            return None;
        };
        let url = format!(
            "https://api.steampowered.com/ISteamUser/ResolveVanityURL/v1/?key={}&vanityurl={}",
            api_key, vanity
        );
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: serde_json::Value = response.json().await.ok()?;
        let payload = body.get("response")?;
        if payload.get("success")?.as_i64()? != 1 {
            return None;
        }
        payload
            .get("steamid")?
            .as_str()
            .map(|steamid| steamid.to_string())
    }
}

#[async_trait]
impl IdentityDirectory for SteamDirectory {
    async fn validate_identity(&self, id: &str) -> Option<IdentityRecord> {
        let profile = self.fetch_profile(id).await?;
        Some(IdentityRecord {
            id: id.to_string(),
            valid: profile.avatar.is_some(),
            avatar: profile.avatar,
            name: profile.name,
        })
    }

    async fn validate_identities(&self, ids: &[String]) -> Option<Vec<IdentityRecord>> {
        let mut set = JoinSet::new();
        for (index, id) in ids.iter().enumerate() {
            let directory = self.clone();
            let id = id.clone();
            set.spawn(async move {
                let record = directory
                    .validate_identity(&id)
                    .await
                    .unwrap_or_else(|| IdentityRecord::invalid(&id));
                (index, record)
            });
        }

        let mut records: Vec<Option<IdentityRecord>> = vec![None; ids.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, record)) => records[index] = Some(record),
                Err(err) => warn!(error = %err, "batch lookup task failed"),
            }
        }
        // Per-id failures degrade to invalid records; the batch itself answers
        Some(
            records
                .into_iter()
                .enumerate()
                .map(|(index, record)| record.unwrap_or_else(|| IdentityRecord::invalid(&ids[index])))
                .collect(),
        )
    }

    async fn resolve_profile(&self, reference: &str) -> Option<ResolvedProfile> {
        let captures = profile_path_pattern().captures(reference)?;
        let canonical_id = match (captures.get(1), captures.get(2)) {
            (Some(vanity), _) => self.resolve_vanity(vanity.as_str()).await?,
            (None, Some(numeric)) => numeric.as_str().to_string(),
            (None, None) => return None,
        };

        let profile = self.fetch_profile(&canonical_id).await?;
        Some(ResolvedProfile {
            canonical_id,
            avatar: profile.avatar,
            name: profile.name,
        })
    }
}

struct SteamProfile {
    avatar: Option<String>,
    name: Option<String>,
}

/// Pull avatar and display name out of a community profile XML document.
/// `avatarFull` is preferred over `avatar`; the display name comes from the
/// `steamID` element. Values arrive as CDATA.
fn parse_profile_xml(text: &str) -> Option<SteamProfile> {
    let mut reader = Reader::from_str(text);
    let mut current: Option<Vec<u8>> = None;
    let mut avatar_full = None;
    let mut avatar = None;
    let mut name = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(e)) => {
                record_field(&current, e.as_ref(), &mut avatar_full, &mut avatar, &mut name);
            }
            Ok(Event::CData(e)) => {
                record_field(&current, e.as_ref(), &mut avatar_full, &mut avatar, &mut name);
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            Ok(_) => {}
        }
    }

    Some(SteamProfile {
        avatar: avatar_full.or(avatar),
        name,
    })
}

/// Store a text or CDATA payload under whichever profile field is currently
/// open, first occurrence wins
fn record_field(
    current: &Option<Vec<u8>>,
    raw: &[u8],
    avatar_full: &mut Option<String>,
    avatar: &mut Option<String>,
    name: &mut Option<String>,
) {
    let value = String::from_utf8_lossy(raw).trim().to_string();
    if value.is_empty() {
        return;
    }
    match current.as_deref() {
        Some(b"avatarFull") if avatar_full.is_none() => *avatar_full = Some(value),
        Some(b"avatar") if avatar.is_none() => *avatar = Some(value),
        Some(b"steamID") if name.is_none() => *name = Some(value),
        _ => {}
    }
}
