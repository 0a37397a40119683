use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use db::models::post::{ImageEngine, PostCategory, PostType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::services::cache_budget::{cache_budgets, should_warn};

/// Generated-but-unpublished post content staged for review.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DraftPost {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: String,
    pub post_type: PostType,
    pub source_topic: Option<String>,
    pub source_category: Option<PostCategory>,
    pub image_engine: ImageEngine,
    pub reference_image_url: Option<String>,
}

/// A live draft lineage. The `preview_id` stays stable across regenerations;
/// `version` increases by one per regeneration so stale callers can be
/// detected.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PreviewEntry {
    pub preview_id: Uuid,
    pub agent_id: Uuid,
    pub version: i32,
    pub draft: DraftPost,
    #[ts(type = "Date")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "Date")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PreviewStoreError {
    #[error("Preview not found")]
    NotFound,
    #[error("Preview was superseded (expected version {expected}, current {current})")]
    StaleVersion { expected: i32, current: i32 },
}

/// In-memory store for in-flight draft previews. One entry per lineage,
/// owned by the agent that created it; entries expire after a bounded
/// editing-session window.
#[derive(Clone)]
pub struct PreviewStore {
    entries: Arc<DashMap<Uuid, PreviewEntry>>,
    ttl: Duration,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::with_ttl(cache_budgets().previews_ttl)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn is_expired(&self, updated_at: DateTime<Utc>) -> bool {
        if self.ttl.is_zero() {
            return false;
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        Utc::now() - updated_at > ttl
    }

    pub fn prune_expired(&self) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }

        let mut expired = Vec::new();
        for entry in self.entries.iter() {
            if self.is_expired(entry.value().updated_at) {
                expired.push(*entry.key());
            }
        }

        for key in &expired {
            self.entries.remove(key);
        }

        if !expired.is_empty() && should_warn("previews") {
            tracing::warn!(
                "Removed {} expired draft previews (ttl={}s)",
                expired.len(),
                self.ttl.as_secs()
            );
        }

        expired.len()
    }

    fn prune_if_expired(&self, preview_id: &Uuid) -> bool {
        if let Some(entry) = self.entries.get(preview_id) {
            let expired = self.is_expired(entry.updated_at);
            drop(entry);
            if expired {
                self.entries.remove(preview_id);
                if should_warn("previews") {
                    tracing::warn!(
                        "Draft preview {preview_id} expired (ttl={}s)",
                        self.ttl.as_secs()
                    );
                }
                return true;
            }
        }
        false
    }

    /// Registers a fresh draft, minting a new lineage at version 1.
    pub fn insert(&self, agent_id: Uuid, draft: DraftPost) -> PreviewEntry {
        self.prune_expired();
        let now = Utc::now();
        let entry = PreviewEntry {
            preview_id: Uuid::new_v4(),
            agent_id,
            version: 1,
            draft,
            created_at: now,
            updated_at: now,
        };
        self.entries.insert(entry.preview_id, entry.clone());
        entry
    }

    /// Returns the live draft for a lineage. An entry owned by a different
    /// agent is reported as absent so one agent can never address another
    /// agent's draft.
    pub fn get(&self, preview_id: Uuid, agent_id: Uuid) -> Option<PreviewEntry> {
        if self.prune_if_expired(&preview_id) {
            return None;
        }
        self.entries
            .get(&preview_id)
            .filter(|entry| entry.agent_id == agent_id)
            .map(|entry| entry.clone())
    }

    /// Replaces the draft for a lineage, bumping its version. When
    /// `expected_version` is supplied and no longer matches, the call fails
    /// instead of silently discarding a newer draft.
    pub fn replace(
        &self,
        preview_id: Uuid,
        agent_id: Uuid,
        expected_version: Option<i32>,
        draft: DraftPost,
    ) -> Result<PreviewEntry, PreviewStoreError> {
        if self.prune_if_expired(&preview_id) {
            return Err(PreviewStoreError::NotFound);
        }

        let mut entry = self
            .entries
            .get_mut(&preview_id)
            .filter(|entry| entry.agent_id == agent_id)
            .ok_or(PreviewStoreError::NotFound)?;

        if let Some(expected) = expected_version
            && expected != entry.version
        {
            return Err(PreviewStoreError::StaleVersion {
                expected,
                current: entry.version,
            });
        }

        entry.version += 1;
        entry.draft = draft;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// Removes the entry for a lineage. Idempotent: removing an absent or
    /// foreign entry returns `None`.
    pub fn remove(&self, preview_id: Uuid, agent_id: Uuid) -> Option<PreviewEntry> {
        let owned = self
            .entries
            .get(&preview_id)
            .is_some_and(|entry| entry.agent_id == agent_id);
        if !owned {
            return None;
        }
        self.entries.remove(&preview_id).map(|(_, entry)| entry)
    }
}

impl Default for PreviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;

    fn sample_draft() -> DraftPost {
        DraftPost {
            title: Some("Hello".to_string()),
            description: Some("A post".to_string()),
            image_url: "https://cdn.example.com/img.png".to_string(),
            post_type: PostType::AiGenerated,
            source_topic: None,
            source_category: None,
            image_engine: ImageEngine::DallE3,
            reference_image_url: None,
        }
    }

    #[test]
    fn insert_mints_lineage_at_version_one() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let agent_id = Uuid::new_v4();

        let entry = store.insert(agent_id, sample_draft());

        assert_eq!(entry.version, 1);
        assert_eq!(entry.agent_id, agent_id);
        assert!(store.get(entry.preview_id, agent_id).is_some());
    }

    #[test]
    fn get_hides_entries_from_other_agents() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let entry = store.insert(Uuid::new_v4(), sample_draft());

        assert!(store.get(entry.preview_id, Uuid::new_v4()).is_none());
    }

    #[test]
    fn replace_bumps_version_and_keeps_preview_id() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let agent_id = Uuid::new_v4();
        let entry = store.insert(agent_id, sample_draft());

        let mut new_draft = sample_draft();
        new_draft.title = Some("Funnier".to_string());
        let replaced = store
            .replace(entry.preview_id, agent_id, Some(1), new_draft)
            .unwrap();

        assert_eq!(replaced.preview_id, entry.preview_id);
        assert_eq!(replaced.version, 2);
        assert_eq!(
            store
                .get(entry.preview_id, agent_id)
                .unwrap()
                .draft
                .title
                .as_deref(),
            Some("Funnier")
        );
    }

    #[test]
    fn replace_rejects_stale_version() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let agent_id = Uuid::new_v4();
        let entry = store.insert(agent_id, sample_draft());

        store
            .replace(entry.preview_id, agent_id, None, sample_draft())
            .unwrap();

        let err = store
            .replace(entry.preview_id, agent_id, Some(1), sample_draft())
            .expect_err("expected stale version");
        assert!(matches!(
            err,
            PreviewStoreError::StaleVersion {
                expected: 1,
                current: 2
            }
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let agent_id = Uuid::new_v4();
        let entry = store.insert(agent_id, sample_draft());

        assert!(store.remove(entry.preview_id, agent_id).is_some());
        assert!(store.remove(entry.preview_id, agent_id).is_none());
    }

    #[test]
    fn expired_entry_surfaces_as_absent() {
        let store = PreviewStore::with_ttl(Duration::from_secs(60));
        let agent_id = Uuid::new_v4();
        let entry = store.insert(agent_id, sample_draft());

        if let Some(mut stored) = store.entries.get_mut(&entry.preview_id) {
            stored.updated_at = Utc::now() - ChronoDuration::seconds(61);
        }

        assert!(store.get(entry.preview_id, agent_id).is_none());
        assert_eq!(store.entry_count(), 0);
    }
}
