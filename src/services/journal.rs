//! Journal versioning and visibility.
//!
//! The aggregate math (version assignment, pointer rules, projections) lives
//! on the model; this service owns persistence, ownership filtering and the
//! optimistic concurrency guard around the append read-modify-write.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::models::journal::{fields, EntryDraft, JournalEntry, STATUS_PROCESSING, STATUS_PUBLIC};
use crate::store::{collections, Collection, DocFilter, Store};

/// Attempts for the append compare-and-set before giving up with a 409
const APPEND_ATTEMPTS: u32 = 3;

/// Optional filters for the public listing. Empty strings count as absent;
/// the date range only applies when both ends are present.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PublicListingQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub topic: Option<String>,
    pub tag: Option<String>,
    pub user: Option<String>,
}

pub struct JournalService {
    journals: Collection<JournalEntry>,
}

impl JournalService {
    pub fn new(store: &Store) -> Self {
        Self {
            journals: store.collection(collections::JOURNAL),
        }
    }

    fn owned(journal_id: &str, user_id: &str) -> DocFilter {
        DocFilter::new()
            .eq(fields::JOURNAL_ID, journal_id)
            .eq(fields::USER_ID, user_id)
    }

    /// Filter for the conditional append write: the aggregate must still
    /// carry the pointer value read before the mutation.
    fn append_guard(journal_id: &str, user_id: &str, expected_version: u32) -> DocFilter {
        Self::owned(journal_id, user_id).eq(fields::VERSION, expected_version)
    }

    /// Patch keys come from the `fields` constants so they cannot drift from
    /// the stored serialization.
    fn version_patch(journal: &JournalEntry) -> Value {
        json!({
            (fields::VERSION): journal.version,
            (fields::UPDATED_AT): journal.updated_at,
        })
    }

    fn status_patch(status: &str) -> Value {
        json!({
            (fields::STATUS): status,
            (fields::UPDATED_AT): Utc::now(),
        })
    }

    fn build_public_filter(query: &PublicListingQuery) -> DocFilter {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|s| !s.is_empty())
        }

        let mut filter = DocFilter::new().eq(fields::STATUS, STATUS_PUBLIC);

        if let (Some(start), Some(end)) = (present(&query.start), present(&query.end)) {
            filter = filter.between_text(fields::CREATED_AT, start, end);
        }
        if let Some(category) = present(&query.category) {
            filter = filter.member(fields::TAXONOMY, fields::CATEGORIES, category);
        }
        if let Some(subcategory) = present(&query.subcategory) {
            filter = filter.member(fields::TAXONOMY, fields::SUBCATEGORIES, subcategory);
        }
        if let Some(topic) = present(&query.topic) {
            filter = filter.member(fields::TAXONOMY, fields::TOPICS, topic);
        }
        if let Some(tag) = present(&query.tag) {
            filter = filter.member(fields::TAXONOMY, fields::TAGS, tag);
        }
        if let Some(user) = present(&query.user) {
            filter = filter.eq(fields::USER_ID, user);
        }

        filter
    }

    async fn load_owned(&self, journal_id: &str, user_id: &str) -> Result<JournalEntry, ApiError> {
        Ok(self
            .journals
            .find_required(Self::owned(journal_id, user_id), "Journal entry")
            .await?)
    }

    /// Create a new aggregate seeded with entry version 1.
    pub async fn create(&self, user_id: &str, draft: EntryDraft) -> Result<JournalEntry, ApiError> {
        let journal = JournalEntry::create(user_id, draft);
        self.journals.insert_one(&journal).await?;
        Ok(journal)
    }

    /// Append a new revision and move the pointer onto it.
    ///
    /// The write is conditioned on the pointer value read beforehand, so two
    /// concurrent appends cannot both commit the same version number. On a
    /// miss the whole read-modify-write is retried against fresh state.
    pub async fn append(
        &self,
        journal_id: &str,
        user_id: &str,
        draft: EntryDraft,
    ) -> Result<JournalEntry, ApiError> {
        for attempt in 0..APPEND_ATTEMPTS {
            let mut journal = self.load_owned(journal_id, user_id).await?;
            let expected = journal.version;
            journal.append(draft.clone());

            let guard = Self::append_guard(journal_id, user_id, expected);
            if self.journals.replace_one(guard, &journal).await? == 1 {
                return Ok(journal);
            }
            warn!(
                journal_id,
                attempt, "append lost a concurrent update race, retrying"
            );
        }
        Err(ApiError::conflict("Journal entry was modified concurrently"))
    }

    /// Repoint the current version onto an existing revision.
    pub async fn set_current_version(
        &self,
        journal_id: &str,
        user_id: &str,
        target: u32,
    ) -> Result<JournalEntry, ApiError> {
        let mut journal = self.load_owned(journal_id, user_id).await?;
        if !journal.set_current_version(target) {
            return Err(ApiError::InvalidVersion(target));
        }

        self.journals
            .merge_one(Self::owned(journal_id, user_id), Self::version_patch(&journal))
            .await?;
        Ok(journal)
    }

    /// Overwrite the lifecycle status. Any string is accepted; a missing
    /// aggregate is not surfaced.
    pub async fn set_status(
        &self,
        journal_id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<(), ApiError> {
        self.journals
            .merge_one(Self::owned(journal_id, user_id), Self::status_patch(status))
            .await?;
        Ok(())
    }

    /// Convenience transition used by the processing pipeline trigger.
    pub async fn mark_processing(&self, journal_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.set_status(journal_id, user_id, STATUS_PROCESSING).await
    }

    /// Fetch by id alone; the caller picks the projection for its viewer.
    pub async fn get(&self, journal_id: &str) -> Result<JournalEntry, ApiError> {
        Ok(self
            .journals
            .find_required(
                DocFilter::new().eq(fields::JOURNAL_ID, journal_id),
                "Journal entry",
            )
            .await?)
    }

    pub async fn list_public(
        &self,
        query: &PublicListingQuery,
    ) -> Result<Vec<JournalEntry>, ApiError> {
        Ok(self
            .journals
            .find_many(Self::build_public_filter(query))
            .await?)
    }

    /// Everything a user owns, regardless of status.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<JournalEntry>, ApiError> {
        Ok(self
            .journals
            .find_many(DocFilter::new().eq(fields::USER_ID, user_id))
            .await?)
    }

    /// Hard delete. Deleting something that is not there (or not owned by
    /// the caller) silently succeeds.
    pub async fn delete(&self, journal_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.journals
            .delete_one(Self::owned(journal_id, user_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilterParam;

    fn containment(filter: &DocFilter) -> serde_json::Value {
        let (_, params) = filter.to_sql(1);
        match params.into_iter().next() {
            Some(FilterParam::Json(v)) => v,
            other => panic!("expected a containment param, got {:?}", other),
        }
    }

    #[test]
    fn append_guard_pins_the_preread_version() {
        let guard = JournalService::append_guard("j1", "u1", 4);
        let doc = containment(&guard);
        assert_eq!(doc["journalID"], "j1");
        assert_eq!(doc["userID"], "u1");
        assert_eq!(doc["version"], 4);
    }

    #[test]
    fn public_filter_always_pins_public_status() {
        let filter = JournalService::build_public_filter(&PublicListingQuery::default());
        assert_eq!(containment(&filter)["status"], "public");
    }

    #[test]
    fn public_filter_requires_both_range_ends() {
        let only_start = PublicListingQuery {
            start: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let (sql, _) = JournalService::build_public_filter(&only_start).to_sql(1);
        assert_eq!(sql, "doc @> $1");

        let both = PublicListingQuery {
            start: Some("2024-01-01".to_string()),
            end: Some("2024-12-31".to_string()),
            ..Default::default()
        };
        let (sql, _) = JournalService::build_public_filter(&both).to_sql(1);
        assert!(sql.contains("doc->>'createdAt' >= $2"));
        assert!(sql.contains("doc->>'createdAt' <= $3"));
    }

    #[test]
    fn public_filter_treats_empty_strings_as_absent() {
        let query = PublicListingQuery {
            tag: Some(String::new()),
            user: Some(String::new()),
            ..Default::default()
        };
        let doc = containment(&JournalService::build_public_filter(&query));
        assert!(doc.get("taxonomy").is_none());
        assert!(doc.get("userID").is_none());
    }

    #[test]
    fn patch_keys_match_the_stored_serialization() {
        let journal = JournalEntry::create(
            "u1",
            EntryDraft {
                title: "t".to_string(),
                content: "c".to_string(),
                attachments: vec![],
            },
        );
        let stored = serde_json::to_value(&journal).unwrap();

        for patch in [
            JournalService::version_patch(&journal),
            JournalService::status_patch("public"),
        ] {
            for key in patch.as_object().unwrap().keys() {
                assert!(stored.get(key).is_some(), "patch key {} not in document", key);
            }
        }
    }

    #[test]
    fn public_filter_combines_taxonomy_and_owner() {
        let query = PublicListingQuery {
            category: Some("engineering".to_string()),
            tag: Some("rust".to_string()),
            user: Some("u9".to_string()),
            ..Default::default()
        };
        let doc = containment(&JournalService::build_public_filter(&query));
        assert_eq!(doc["taxonomy"]["categories"], serde_json::json!(["engineering"]));
        assert_eq!(doc["taxonomy"]["tags"], serde_json::json!(["rust"]));
        assert_eq!(doc["userID"], "u9");
        assert_eq!(doc["status"], "public");
    }
}
