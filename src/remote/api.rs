//! Request/response contracts between the engine and the remote store.
//!
//! Transport is the host's concern: the engine emits [`RemoteRequest`]
//! values, the host carries them over whatever framework it uses and
//! reports back a [`RemoteResult`]. Archive listings are a read-side
//! contract with their own query/page types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::archive::{ArchiveBucket, ArchivedItem};
use crate::model::item::Priority;
use crate::model::partition::Partition;

/// Sparse field changes carried by update calls. Only set fields are
/// applied; the inner `Option` distinguishes "clear this field" (an
/// explicit null on the wire) from "leave it alone" (absent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<Partition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "explicit_null"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "explicit_null"
    )]
    pub today_pinned: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Keeps `Some(None)` round-trippable: a present null is the "clear this
/// field" signal, which a plain derive would collapse into "absent".
mod explicit_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.partition.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.today_pinned.is_none()
            && self.tags.is_none()
    }
}

/// A state-changing request the engine asks the host transport to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteRequest {
    /// Persist a full ordering for one partition
    Reorder {
        partition: Partition,
        ordered_ids: Vec<String>,
    },
    /// Apply the same field changes to all listed IDs atomically
    BatchUpdate {
        ids: Vec<String>,
        changes: FieldChanges,
    },
    SingleUpdate {
        id: String,
        changes: FieldChanges,
    },
    Archive {
        ids: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Unarchive {
        ids: Vec<String>,
    },
    Delete {
        ids: Vec<String>,
    },
}

/// Server-confirmed field values for one item, echoed back so the client
/// can reconcile server-computed fields (e.g. derived default due dates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedItem {
    pub id: String,
    pub changes: FieldChanges,
}

/// Successful outcome of a remote call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteOk {
    /// Confirmed payloads for value changes; empty for reorders
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated: Vec<UpdatedItem>,
}

/// Rejection taxonomy for remote calls
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RemoteError {
    /// Malformed or policy-violating field values. Never retried silently;
    /// the message is surfaced verbatim where available.
    #[error("validation rejected: {0}")]
    Validation(String),
    /// Ownership or permission failure. Surfaced with a generic message.
    #[error("not authorized")]
    Authorization,
    /// Network or timeout failure. Eligible for a manual retry.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The item vanished server-side, e.g. deleted by another session
    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Whether re-issuing the same mutation is a sensible user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

pub type RemoteResult = Result<RemoteOk, RemoteError>;

/// Filter for archive listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<ArchiveBucket>,
    /// Inclusive archived-at day range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    /// Case-insensitive pattern matched against title and tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Zero-based page index
    #[serde(default)]
    pub page: usize,
}

/// One page of an archive listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePage {
    pub entries: Vec<ArchivedItem>,
    pub page: usize,
    pub page_size: usize,
    /// Total matching entries across all pages
    pub total: usize,
}

impl ArchivePage {
    pub fn has_more(&self) -> bool {
        (self.page + 1) * self.page_size < self.total
    }
}
