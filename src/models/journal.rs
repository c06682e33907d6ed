use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_PUBLIC: &str = "public";

/// JSON field names used in store filters. These mirror the serde renames
/// below; a filter and the stored document must agree on them.
pub mod fields {
    pub const JOURNAL_ID: &str = "journalID";
    pub const USER_ID: &str = "userID";
    pub const VERSION: &str = "version";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const TAXONOMY: &str = "taxonomy";
    pub const CATEGORIES: &str = "categories";
    pub const SUBCATEGORIES: &str = "subcategories";
    pub const TOPICS: &str = "topics";
    pub const TAGS: &str = "tags";
}

/// The journal aggregate: append-only entry history plus a movable
/// current-version pointer and a free-form lifecycle status.
///
/// Invariants:
/// - `entries` is never empty once the aggregate exists
/// - entry versions are strictly increasing from 1, assigned `max + 1` at
///   append time, never reused
/// - `version` points at an existing entry version whenever it is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(rename = "journalID")]
    pub journal_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub version: u32,
    pub entries: Vec<Entry>,
    pub status: String,
    #[serde(default)]
    pub taxonomy: Taxonomy,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One revision in the journal's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub version: u32,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Categories, subcategories, topics and tags; only used for filtering
/// public listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Client-supplied entry payload. The server assigns version and timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl EntryDraft {
    fn into_entry(self, version: u32, now: DateTime<Utc>) -> Entry {
        Entry {
            version,
            title: self.title,
            content: self.content,
            attachments: self.attachments,
            updated_at: now,
        }
    }
}

impl JournalEntry {
    /// Seed a new aggregate: entry version 1, pointer at 1, status pending.
    pub fn create(user_id: &str, draft: EntryDraft) -> Self {
        let now = Utc::now();
        Self {
            journal_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            version: 1,
            entries: vec![draft.into_entry(1, now)],
            status: STATUS_PENDING.to_string(),
            taxonomy: Taxonomy::default(),
            summary: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Highest entry version present in the history.
    pub fn max_entry_version(&self) -> u32 {
        self.entries.iter().map(|e| e.version).max().unwrap_or(0)
    }

    /// Append a new revision at `max + 1` and move the pointer onto it.
    /// Using the history maximum rather than the pointer keeps versions
    /// strictly increasing even after the pointer was moved backwards.
    pub fn append(&mut self, draft: EntryDraft) -> u32 {
        let now = Utc::now();
        let next = self.max_entry_version() + 1;
        self.entries.push(draft.into_entry(next, now));
        self.version = next;
        self.updated_at = now;
        next
    }

    pub fn has_version(&self, version: u32) -> bool {
        self.entries.iter().any(|e| e.version == version)
    }

    /// Repoint the current version. Returns false (and leaves the aggregate
    /// untouched) when the target version is not in the history.
    pub fn set_current_version(&mut self, target: u32) -> bool {
        if !self.has_version(target) {
            return false;
        }
        self.version = target;
        self.updated_at = Utc::now();
        true
    }

    pub fn last_entry(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn meta(&self) -> JournalMeta {
        JournalMeta {
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            status: self.status.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Projection for authenticated readers: all metadata plus the entire
    /// entry history.
    pub fn owner_view(self) -> OwnerView {
        OwnerView {
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            status: self.status,
            user_id: self.user_id,
            entries: self.entries,
            taxonomy: self.taxonomy,
            summary: self.summary,
        }
    }

    /// Projection for anonymous readers: the last-appended entry wrapped in
    /// a one-element sequence. This is the newest revision, not the one the
    /// `version` pointer selects.
    pub fn public_view(self) -> PublicView {
        let latest = self.entries.into_iter().last();
        PublicView {
            journal_id: self.journal_id,
            user_id: self.user_id,
            version: self.version,
            status: self.status,
            taxonomy: self.taxonomy,
            summary: self.summary,
            entries: latest.into_iter().collect(),
        }
    }
}

/// GET /journal/{id}/meta response
#[derive(Debug, Serialize)]
pub struct JournalMeta {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    pub status: String,
    #[serde(rename = "userID")]
    pub user_id: String,
}

/// Authenticated read projection
#[derive(Debug, Serialize)]
pub struct OwnerView {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    pub status: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub entries: Vec<Entry>,
    pub taxonomy: Taxonomy,
    pub summary: String,
}

/// Anonymous read projection
#[derive(Debug, Serialize)]
pub struct PublicView {
    #[serde(rename = "journalID")]
    pub journal_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub version: u32,
    pub status: String,
    pub taxonomy: Taxonomy,
    pub summary: String,
    pub entries: Vec<Entry>,
}
