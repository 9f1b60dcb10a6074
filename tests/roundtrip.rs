//! End-to-end flows across the format engine: detect, parse, edit, validate,
//! and serialize, the way an editing front end drives it.

use async_trait::async_trait;
use gsedit::codecs::{cfg, detect, privileges};
use gsedit::models::{CfgEntry, CfgItem};
use gsedit::services::{
    IdentityDirectory, IdentityRecord, IdentitySession, ResolvedProfile, SessionConfig,
};
use gsedit::validation;
use gsedit::FormatKind;
use std::collections::HashMap;
use std::sync::Arc;

struct FixedDirectory {
    records: HashMap<String, IdentityRecord>,
}

impl FixedDirectory {
    fn new(records: Vec<IdentityRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityDirectory for FixedDirectory {
    async fn validate_identity(&self, id: &str) -> Option<IdentityRecord> {
        self.records.get(id).cloned()
    }

    async fn validate_identities(&self, ids: &[String]) -> Option<Vec<IdentityRecord>> {
        Some(
            ids.iter()
                .filter_map(|id| self.records.get(id).cloned())
                .collect(),
        )
    }

    async fn resolve_profile(&self, _reference: &str) -> Option<ResolvedProfile> {
        None
    }
}

#[test]
fn parse_example_from_the_wire_format() {
    let xml = r#"<Privileges>
    <Privilege Name="Administrator">
        <SteamIDs>
            <!-- Admins -->
            <SteamID id="76561198000000000" name="X" showColors="1"/>
        </SteamIDs>
    </Privilege>
</Privileges>"#;

    let groups = privileges::parse(xml);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].comment, "Admins");
    assert_eq!(groups[0].entries.len(), 1);
    assert_eq!(groups[0].entries[0].id, "76561198000000000");
    assert_eq!(groups[0].entries[0].name, "X");
    assert_eq!(groups[0].entries[0].show_colors, "1");
}

#[test]
fn cfg_duplicate_example() {
    let mut items = vec![
        CfgItem::entry("sv_name", "A"),
        CfgItem::group("G", vec![CfgEntry::new("sv_name", "B")]),
    ];
    let report = validation::validate(&mut items);

    assert!(report.has_duplicates);
    match (&items[0], &items[1]) {
        (CfgItem::Entry(flat), CfgItem::Group(block)) => {
            assert!(flat.duplicate);
            assert!(block.entries[0].duplicate);
        }
        _ => panic!("model shape changed"),
    }
}

#[test]
fn detect_then_round_trip_cfg() {
    let text = "sv_name=My Server\n# Weather\nfog=1\n# END Weather\n";
    assert_eq!(detect(text), FormatKind::Cfg);

    let mut items = cfg::parse(text);
    let report = validation::validate(&mut items);
    assert!(!report.has_duplicates);

    let serialized = cfg::serialize(&items);
    assert_eq!(cfg::parse(&serialized), items);
}

#[test]
fn detect_then_round_trip_privileges() {
    let xml = r#"<Privileges><Privilege Name="Administrator"><SteamIDs>
        <!-- Admins -->
        <SteamID id="76561198000000001" name="A" showColors="1"/>
        <SteamID id="76561198000000002" name="B" showColors="0"/>
        <!-- Mods -->
        <SteamID id="76561198000000003" name="C" showColors="1"/>
    </SteamIDs></Privilege></Privileges>"#;
    assert_eq!(detect(xml), FormatKind::Privileges);

    let first = privileges::parse(xml);
    let second = privileges::parse(&privileges::serialize(&first));
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn bulk_load_then_validate_then_export() {
    let xml = r#"<Privileges><Privilege Name="Administrator"><SteamIDs>
        <!-- Admins -->
        <SteamID id="76561198000000001" name="" showColors="1"/>
        <SteamID id="76561198000000002" name="B" showColors="1"/>
    </SteamIDs></Privilege></Privileges>"#;

    let directory = Arc::new(FixedDirectory::new(vec![IdentityRecord {
        id: "76561198000000001".to_string(),
        valid: true,
        avatar: Some("http://avatar".to_string()),
        name: Some("FilledIn".to_string()),
    }]));
    let session = IdentitySession::new(directory, SessionConfig::default());

    session.load_privileges(xml).await;
    session.validate_all().await;
    session.settle().await;

    let groups = session.groups().await;
    let entries = &groups[0].entries;
    assert_eq!(entries[0].valid, Some(true));
    assert_eq!(entries[0].name, "FilledIn");
    // Not in the directory's answer: not found, not unknown
    assert_eq!(entries[1].valid, Some(false));
    assert_eq!(entries[1].avatar, None);
    assert!(session.any_invalid().await);

    // Derived resolution state never reaches the serialized format
    let exported = session.export_xml().await;
    assert!(!exported.contains("avatar"));
    assert!(!exported.contains("valid"));
    assert!(exported.contains(r#"<SteamID id="76561198000000001" showColors="1" name="FilledIn"/>"#));
}

#[tokio::test(start_paused = true)]
async fn editing_flow_survives_structural_changes() {
    let directory = Arc::new(FixedDirectory::new(vec![IdentityRecord {
        id: "76561198000000009".to_string(),
        valid: true,
        avatar: None,
        name: None,
    }]));
    let session = IdentitySession::new(directory, SessionConfig::default());

    session.add_group().await;
    session.update_group_comment(0, "Admins").await;
    let keep = session.add_entry(0).await.unwrap();
    let remove = session.add_entry(0).await.unwrap();

    session.update_identifier(keep, "76561198000000009").await;
    session.update_identifier(remove, "76561198000000008").await;
    assert!(session.remove_entry(remove).await);
    session.settle().await;

    let groups = session.groups().await;
    assert_eq!(groups[0].comment, "Admins");
    assert_eq!(groups[0].entries.len(), 1);
    assert_eq!(groups[0].entries[0].valid, Some(true));
}
