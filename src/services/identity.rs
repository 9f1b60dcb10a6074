//! Identity resolution pipeline
//!
//! An [`IdentitySession`] owns one roster and reconciles externally-resolved
//! identity data back into it. Single-field edits are debounced behind a quiet
//! period, profile URLs trigger an eager two-step resolution, and bulk loads
//! validate every entry in one batched call.
//!
//! Every piece of asynchronous work is keyed by the entry's stable slot id and
//! a generation number. A commit only lands when its generation is still the
//! slot's active generation and the slot still resolves to a live entry, so a
//! stale response or a removed row can never write into the model.

use crate::codecs::privileges;
use crate::models::{canonical_id_pattern, profile_url_pattern, Entry, Group};
use crate::services::directory::{IdentityDirectory, IdentityRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// Tuning for the resolution pipeline
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Debounce interval after the last edit before a lookup is issued
    pub quiet_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(700),
        }
    }
}

struct SessionInner {
    groups: RwLock<Vec<Group>>,
    directory: Arc<dyn IdentityDirectory>,
    /// Active request generation per slot; the single source of truth for
    /// "am I still the active request". Never held across an external call.
    active: Mutex<HashMap<Uuid, u64>>,
    /// Outstanding task handles by generation, for cancellation and settling
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
    generations: AtomicU64,
    config: SessionConfig,
}

/// One editing session over a privileges roster
///
/// Cheap to clone; clones share the same model and outstanding-request state.
#[derive(Clone)]
pub struct IdentitySession {
    inner: Arc<SessionInner>,
}

impl IdentitySession {
    pub fn new(directory: Arc<dyn IdentityDirectory>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                groups: RwLock::new(Vec::new()),
                directory,
                active: Mutex::new(HashMap::new()),
                tasks: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn with_defaults(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new(directory, SessionConfig::default())
    }

    /// Replace the model wholesale with a freshly parsed roster, cancelling
    /// all outstanding work
    pub async fn load_privileges(&self, text: &str) {
        self.cancel_all().await;
        *self.inner.groups.write().await = privileges::parse(text);
    }

    /// Snapshot of the current roster
    pub async fn groups(&self) -> Vec<Group> {
        self.inner.groups.read().await.clone()
    }

    /// Serialize the current roster to privileges XML
    pub async fn export_xml(&self) -> String {
        privileges::serialize(&self.inner.groups.read().await)
    }

    /// Whether any entry has resolved as invalid; callers gate export on this
    pub async fn any_invalid(&self) -> bool {
        self.inner
            .groups
            .read()
            .await
            .iter()
            .any(|group| group.entries.iter().any(|entry| entry.valid == Some(false)))
    }

    /// Append a new group with the editor's default label
    pub async fn add_group(&self) {
        self.inner.groups.write().await.push(Group::new("New group"));
    }

    /// Remove a group and cancel pending work for its entries
    pub async fn remove_group(&self, index: usize) -> bool {
        let removed_slots = {
            let mut groups = self.inner.groups.write().await;
            if index >= groups.len() {
                return false;
            }
            let group = groups.remove(index);
            group.entries.iter().map(|entry| entry.slot).collect::<Vec<_>>()
        };
        for slot in removed_slots {
            self.cancel_pending(slot).await;
        }
        true
    }

    /// Append a blank entry to a group, returning its slot
    pub async fn add_entry(&self, group_index: usize) -> Option<Uuid> {
        let mut groups = self.inner.groups.write().await;
        let group = groups.get_mut(group_index)?;
        let entry = Entry::blank();
        let slot = entry.slot;
        group.entries.push(entry);
        Some(slot)
    }

    /// Remove an entry and cancel any pending work for it
    pub async fn remove_entry(&self, slot: Uuid) -> bool {
        let removed = {
            let mut groups = self.inner.groups.write().await;
            let mut removed = false;
            for group in groups.iter_mut() {
                if let Some(position) = group.entries.iter().position(|entry| entry.slot == slot) {
                    group.entries.remove(position);
                    removed = true;
                    break;
                }
            }
            removed
        };
        if removed {
            self.cancel_pending(slot).await;
        }
        removed
    }

    pub async fn update_group_comment(&self, index: usize, value: &str) {
        if let Some(group) = self.inner.groups.write().await.get_mut(index) {
            group.comment = value.to_string();
        }
    }

    pub async fn update_name(&self, slot: Uuid, value: &str) {
        let mut groups = self.inner.groups.write().await;
        if let Some(entry) = find_entry_mut(&mut groups, slot) {
            entry.name = value.to_string();
        }
    }

    pub async fn update_show_colors(&self, slot: Uuid, checked: bool) {
        let mut groups = self.inner.groups.write().await;
        if let Some(entry) = find_entry_mut(&mut groups, slot) {
            entry.show_colors = (if checked { "1" } else { "0" }).to_string();
        }
    }

    /// Update an entry's identifier and kick off resolution
    ///
    /// Profile-URL input resolves eagerly; canonical 17-digit input starts the
    /// debounce timer; anything else resets the entry to idle without issuing
    /// a request. A new edit supersedes whatever was pending for the slot.
    pub async fn update_identifier(&self, slot: Uuid, raw: &str) {
        let value = raw.trim().to_string();
        {
            let mut groups = self.inner.groups.write().await;
            let Some(entry) = find_entry_mut(&mut groups, slot) else {
                return;
            };
            entry.id = value.clone();
        }

        if profile_url_pattern().is_match(&value) {
            let generation = self.begin_request(slot).await;
            {
                let mut groups = self.inner.groups.write().await;
                if let Some(entry) = find_entry_mut(&mut groups, slot) {
                    entry.begin_loading();
                }
            }
            let session = self.clone();
            let handle = tokio::spawn(async move {
                session.run_profile_resolution(slot, generation, value).await;
            });
            self.track(generation, handle).await;
            return;
        }

        if !canonical_id_pattern().is_match(&value) {
            // Syntactically invalid input costs nothing
            self.cancel_pending(slot).await;
            let mut groups = self.inner.groups.write().await;
            if let Some(entry) = find_entry_mut(&mut groups, slot) {
                entry.reset_resolution();
            }
            return;
        }

        let generation = self.begin_request(slot).await;
        let session = self.clone();
        let handle = tokio::spawn(async move {
            session.run_debounced_validation(slot, generation).await;
        });
        self.track(generation, handle).await;
    }

    /// Validate every well-formed identifier in one batched call
    ///
    /// Identifiers absent from the response are marked invalid ("no result"
    /// means "not found", not "unknown"); a failed batch marks every entry it
    /// covered invalid. Nothing is ever left loading.
    pub async fn validate_all(&self) {
        let ids: Vec<String> = {
            let mut groups = self.inner.groups.write().await;
            let mut ids = Vec::new();
            for group in groups.iter_mut() {
                for entry in group.entries.iter_mut() {
                    if entry.has_canonical_id() {
                        ids.push(entry.id.clone());
                        entry.begin_loading();
                    }
                }
            }
            ids
        };
        if ids.is_empty() {
            return;
        }
        debug!(count = ids.len(), "bulk validation started");

        let results = self.inner.directory.validate_identities(&ids).await;
        let by_id: HashMap<String, IdentityRecord> = results
            .unwrap_or_default()
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        let mut groups = self.inner.groups.write().await;
        for group in groups.iter_mut() {
            for entry in group.entries.iter_mut() {
                if entry.has_canonical_id() {
                    match by_id.get(&entry.id) {
                        Some(record) => entry.commit(
                            record.valid,
                            record.avatar.clone(),
                            record.name.clone(),
                        ),
                        None => entry.commit(false, None, None),
                    }
                } else if entry.loading {
                    // The identifier was edited away while the batch was in
                    // flight; drop it back to idle
                    entry.reset_resolution();
                }
            }
        }
    }

    /// Await every outstanding resolution task
    pub async fn settle(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut tasks = self.inner.tasks.lock().await;
                tasks.drain().map(|(_, handle)| handle).collect()
            };
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                // Aborted tasks settle with a JoinError, which is expected
                let _ = handle.await;
            }
        }
    }

    async fn run_debounced_validation(self, slot: Uuid, generation: u64) {
        tokio::time::sleep(self.inner.config.quiet_period).await;
        if !self.is_active(slot, generation).await {
            self.finish(slot, generation).await;
            return;
        }

        // Re-fetch by slot: the identifier may have been edited again and this
        // timer is only still alive if that edit was ours
        let id = {
            let mut groups = self.inner.groups.write().await;
            match find_entry_mut(&mut groups, slot) {
                Some(entry) => {
                    entry.begin_loading();
                    entry.id.clone()
                }
                None => {
                    self.finish(slot, generation).await;
                    return;
                }
            }
        };

        let record = self.inner.directory.validate_identity(&id).await;
        self.commit(slot, generation, move |entry| match record {
            Some(record) => entry.commit(record.valid, record.avatar, record.name),
            None => entry.commit(false, None, None),
        })
        .await;
        self.finish(slot, generation).await;
    }

    async fn run_profile_resolution(self, slot: Uuid, generation: u64, reference: String) {
        let resolved = self.inner.directory.resolve_profile(&reference).await;

        let canonical_id = match resolved {
            Some(profile) => {
                let canonical_id = profile.canonical_id.clone();
                let committed = self
                    .commit(slot, generation, move |entry| {
                        entry.id = profile.canonical_id;
                        entry.avatar = profile.avatar;
                        if let Some(name) = profile.name {
                            if entry.name.is_empty() {
                                entry.name = name;
                            }
                        }
                    })
                    .await;
                if !committed {
                    self.finish(slot, generation).await;
                    return;
                }
                Some(canonical_id)
            }
            None => None,
        };

        match canonical_id {
            Some(id) => {
                let record = self.inner.directory.validate_identity(&id).await;
                self.commit(slot, generation, move |entry| match record {
                    Some(record) => {
                        entry.loading = false;
                        entry.valid = Some(record.valid);
                        if record.avatar.is_some() {
                            entry.avatar = record.avatar;
                        }
                        if let Some(name) = record.name {
                            if entry.name.is_empty() {
                                entry.name = name;
                            }
                        }
                    }
                    // Failed validate after a successful resolve keeps the
                    // resolved identifier and name but reports invalid
                    None => entry.commit(false, None, None),
                })
                .await;
            }
            None => {
                self.commit(slot, generation, |entry| entry.commit(false, None, None))
                    .await;
            }
        }
        self.finish(slot, generation).await;
    }

    /// Claim the slot for a new request, superseding and aborting any prior one
    async fn begin_request(&self, slot: Uuid) -> u64 {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.inner.active.lock().await.insert(slot, generation);
        if let Some(old) = previous {
            if let Some(handle) = self.inner.tasks.lock().await.remove(&old) {
                handle.abort();
            }
        }
        generation
    }

    async fn track(&self, generation: u64, handle: JoinHandle<()>) {
        self.inner.tasks.lock().await.insert(generation, handle);
    }

    async fn is_active(&self, slot: Uuid, generation: u64) -> bool {
        self.inner.active.lock().await.get(&slot) == Some(&generation)
    }

    /// Apply a mutation to the entry iff this generation is still the slot's
    /// active request and the slot still refers to a live entry
    async fn commit(
        &self,
        slot: Uuid,
        generation: u64,
        apply: impl FnOnce(&mut Entry),
    ) -> bool {
        let mut groups = self.inner.groups.write().await;
        if self.inner.active.lock().await.get(&slot) != Some(&generation) {
            return false;
        }
        match find_entry_mut(&mut groups, slot) {
            Some(entry) => {
                apply(entry);
                true
            }
            None => false,
        }
    }

    async fn finish(&self, slot: Uuid, generation: u64) {
        {
            let mut active = self.inner.active.lock().await;
            if active.get(&slot) == Some(&generation) {
                active.remove(&slot);
            }
        }
        self.inner.tasks.lock().await.remove(&generation);
    }

    async fn cancel_pending(&self, slot: Uuid) {
        let previous = self.inner.active.lock().await.remove(&slot);
        if let Some(generation) = previous {
            if let Some(handle) = self.inner.tasks.lock().await.remove(&generation) {
                handle.abort();
            }
        }
    }

    async fn cancel_all(&self) {
        self.inner.active.lock().await.clear();
        let mut tasks = self.inner.tasks.lock().await;
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

fn find_entry_mut(groups: &mut [Group], slot: Uuid) -> Option<&mut Entry> {
    groups
        .iter_mut()
        .flat_map(|group| group.entries.iter_mut())
        .find(|entry| entry.slot == slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::ResolvedProfile;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    const ID_A: &str = "76561198000000001";
    const ID_B: &str = "76561198000000002";
    const ID_C: &str = "76561198000000003";

    /// Recording directory: answers from fixed maps and logs every call
    #[derive(Default)]
    struct MockDirectory {
        records: HashMap<String, IdentityRecord>,
        profiles: HashMap<String, ResolvedProfile>,
        fail_batch: bool,
        single_calls: StdMutex<Vec<String>>,
        batch_calls: StdMutex<Vec<Vec<String>>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockDirectory {
        fn with_record(mut self, id: &str, valid: bool, avatar: Option<&str>, name: Option<&str>) -> Self {
            self.records.insert(
                id.to_string(),
                IdentityRecord {
                    id: id.to_string(),
                    valid,
                    avatar: avatar.map(String::from),
                    name: name.map(String::from),
                },
            );
            self
        }

        fn with_profile(mut self, reference: &str, profile: ResolvedProfile) -> Self {
            self.profiles.insert(reference.to_string(), profile);
            self
        }
    }

    #[async_trait]
    impl IdentityDirectory for MockDirectory {
        async fn validate_identity(&self, id: &str) -> Option<IdentityRecord> {
            self.single_calls.lock().unwrap().push(id.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.records.get(id).cloned()
        }

        async fn validate_identities(&self, ids: &[String]) -> Option<Vec<IdentityRecord>> {
            self.batch_calls.lock().unwrap().push(ids.to_vec());
            if self.fail_batch {
                return None;
            }
            // Omits ids with no record, like the real directory
            Some(
                ids.iter()
                    .filter_map(|id| self.records.get(id).cloned())
                    .collect(),
            )
        }

        async fn resolve_profile(&self, reference: &str) -> Option<ResolvedProfile> {
            self.profiles.get(reference).cloned()
        }
    }

    async fn session_with_one_entry(
        directory: MockDirectory,
        config: SessionConfig,
    ) -> (IdentitySession, Uuid, Arc<MockDirectory>) {
        let directory = Arc::new(directory);
        let session = IdentitySession::new(directory.clone(), config);
        session.add_group().await;
        let slot = session.add_entry(0).await.unwrap();
        (session, slot, directory)
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_rapid_edits() {
        let directory = MockDirectory::default().with_record(ID_C, true, Some("http://a"), None);
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;

        // Three edits within the quiet period; only the last survives
        session.update_identifier(slot, ID_A).await;
        session.update_identifier(slot, ID_B).await;
        session.update_identifier(slot, ID_C).await;
        session.settle().await;

        let calls = directory.single_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![ID_C.to_string()]);

        let groups = session.groups().await;
        let entry = &groups[0].entries[0];
        assert_eq!(entry.id, ID_C);
        assert_eq!(entry.valid, Some(true));
        assert_eq!(entry.avatar.as_deref(), Some("http://a"));
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_uses_current_id_at_fire_time() {
        let directory = MockDirectory::default().with_record(ID_A, true, None, None);
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;

        session.update_identifier(slot, ID_A).await;
        session.settle().await;

        assert_eq!(
            directory.single_calls.lock().unwrap().clone(),
            vec![ID_A.to_string()]
        );
        assert_eq!(session.groups().await[0].entries[0].valid, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_canonical_input_resets_without_request() {
        let directory = MockDirectory::default();
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;

        // Start a pending validation, then invalidate the input
        session.update_identifier(slot, ID_A).await;
        session.update_identifier(slot, "not-an-id").await;
        session.settle().await;

        assert!(directory.single_calls.lock().unwrap().is_empty());
        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.id, "not-an-id");
        assert_eq!(entry.valid, None);
        assert_eq!(entry.avatar, None);
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_marks_invalid() {
        // No record for the id: the mock answers None
        let directory = MockDirectory::default();
        let (session, slot, _) = session_with_one_entry(directory, SessionConfig::default()).await;

        session.update_identifier(slot, ID_A).await;
        session.settle().await;

        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.valid, Some(false));
        assert_eq!(entry.avatar, None);
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_url_resolves_eagerly() {
        let reference = "https://steamcommunity.com/id/somebody";
        let directory = MockDirectory::default()
            .with_profile(
                reference,
                ResolvedProfile {
                    canonical_id: ID_A.to_string(),
                    avatar: Some("http://resolved".to_string()),
                    name: Some("Somebody".to_string()),
                },
            )
            .with_record(ID_A, true, Some("http://validated"), Some("Somebody"));
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;

        session.update_identifier(slot, reference).await;
        session.settle().await;

        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.id, ID_A);
        assert_eq!(entry.name, "Somebody");
        assert_eq!(entry.valid, Some(true));
        assert_eq!(entry.avatar.as_deref(), Some("http://validated"));
        // Eager path skips the quiet period entirely
        assert_eq!(
            directory.single_calls.lock().unwrap().clone(),
            vec![ID_A.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_resolve_failure_marks_invalid() {
        let directory = MockDirectory::default();
        let (session, slot, _) = session_with_one_entry(directory, SessionConfig::default()).await;

        session
            .update_identifier(slot, "https://steamcommunity.com/id/unknown")
            .await;
        session.settle().await;

        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.valid, Some(false));
        assert_eq!(entry.avatar, None);
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_validate_after_resolve_keeps_identifier() {
        let reference = "https://steamcommunity.com/id/half";
        // Resolve succeeds but there is no validation record for the id
        let directory = MockDirectory::default().with_profile(
            reference,
            ResolvedProfile {
                canonical_id: ID_B.to_string(),
                avatar: Some("http://resolved".to_string()),
                name: Some("Half".to_string()),
            },
        );
        let (session, slot, _) = session_with_one_entry(directory, SessionConfig::default()).await;

        session.update_identifier(slot, reference).await;
        session.settle().await;

        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.id, ID_B);
        assert_eq!(entry.name, "Half");
        assert_eq!(entry.valid, Some(false));
        assert_eq!(entry.avatar, None);
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_mid_flight_causes_no_phantom_write() {
        let gate = Arc::new(Notify::new());
        let directory = MockDirectory {
            gate: Some(gate.clone()),
            ..MockDirectory::default()
        }
        .with_record(ID_A, true, Some("http://a"), None);
        let (session, slot, directory) = session_with_one_entry(
            directory,
            SessionConfig {
                quiet_period: Duration::ZERO,
            },
        )
        .await;

        session.update_identifier(slot, ID_A).await;
        // Let the debounce fire and block inside the directory call
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(directory.single_calls.lock().unwrap().len(), 1);

        assert!(session.remove_entry(slot).await);
        gate.notify_waiters();
        session.settle().await;

        let groups = session.groups().await;
        assert!(groups[0].entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_validation_completeness() {
        let directory = MockDirectory::default()
            .with_record(ID_A, true, Some("http://a"), Some("A"))
            .with_record(ID_C, false, None, None);
        let directory = Arc::new(directory);
        let session = IdentitySession::with_defaults(directory.clone());
        session.add_group().await;
        for id in [ID_A, ID_B, ID_C] {
            let slot = session.add_entry(0).await.unwrap();
            session.update_identifier(slot, id).await;
        }
        session.validate_all().await;
        session.settle().await;

        let groups = session.groups().await;
        let entries = &groups[0].entries;
        assert_eq!(entries[0].valid, Some(true));
        assert_eq!(entries[0].avatar.as_deref(), Some("http://a"));
        // Absent from the response means not found, not unknown
        assert_eq!(entries[1].valid, Some(false));
        assert_eq!(entries[1].avatar, None);
        assert_eq!(entries[2].valid, Some(false));
        assert!(entries.iter().all(|entry| !entry.loading));

        let batches = directory.batch_calls.lock().unwrap().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![ID_A, ID_B, ID_C]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_failure_marks_all_invalid() {
        let directory = MockDirectory {
            fail_batch: true,
            ..MockDirectory::default()
        };
        let (session, slot, _) = session_with_one_entry(directory, SessionConfig::default()).await;
        session.update_identifier(slot, ID_A).await;
        session.validate_all().await;
        session.settle().await;

        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.valid, Some(false));
        assert!(!entry.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_skips_malformed_identifiers() {
        let directory = MockDirectory::default();
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;
        session.update_identifier(slot, "short").await;
        session.validate_all().await;

        assert!(directory.batch_calls.lock().unwrap().is_empty());
        let entry = &session.groups().await[0].entries[0];
        assert_eq!(entry.valid, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_privileges_cancels_outstanding_work() {
        let directory = MockDirectory::default().with_record(ID_A, true, None, None);
        let (session, slot, directory) =
            session_with_one_entry(directory, SessionConfig::default()).await;

        session.update_identifier(slot, ID_A).await;
        session
            .load_privileges("<Privileges><Privilege Name=\"Administrator\"><SteamIDs></SteamIDs></Privilege></Privileges>")
            .await;
        session.settle().await;

        // The debounce was cancelled before its timer fired
        assert!(directory.single_calls.lock().unwrap().is_empty());
        let groups = session.groups().await;
        assert_eq!(groups.len(), 1);
        assert!(groups[0].entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_invalid_gates_export() {
        let directory = MockDirectory::default();
        let (session, slot, _) = session_with_one_entry(directory, SessionConfig::default()).await;
        assert!(!session.any_invalid().await);

        session.update_identifier(slot, ID_A).await;
        session.settle().await;
        assert!(session.any_invalid().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_edits_to_different_fields() {
        let directory = MockDirectory::default()
            .with_record(ID_A, true, None, None)
            .with_record(ID_B, true, None, None);
        let directory = Arc::new(directory);
        let session = IdentitySession::with_defaults(directory.clone());
        session.add_group().await;
        let slot_a = session.add_entry(0).await.unwrap();
        let slot_b = session.add_entry(0).await.unwrap();

        session.update_identifier(slot_a, ID_A).await;
        session.update_identifier(slot_b, ID_B).await;
        session.settle().await;

        // Edits to different fields do not cancel each other
        let mut calls = directory.single_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec![ID_A.to_string(), ID_B.to_string()]);
        let groups = session.groups().await;
        assert_eq!(groups[0].entries[0].valid, Some(true));
        assert_eq!(groups[0].entries[1].valid, Some(true));
    }
}
