//! Queue record types and their store layout
//!
//! Collections consumed by the queue core:
//! - `counters/queue_<date>`: one Counter document per calendar day
//! - `queue/<date>/entries/*`: canonical queue entries for a day
//! - `document-completions/*`: flat legacy projection for the dashboard

use crate::store::{CollectionPath, DocPath, Document, StoreError, StoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Record type tag carried by projection documents for the legacy reader
pub const DOCUMENT_COMPLETION_TYPE: &str = "document-completion";

/// The date string scoping a counter and its queue to a single day
///
/// Partition keys render as `YYYY-MM-DD` and roll over at local midnight;
/// there is no cross-day renumbering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartitionKey(NaiveDate);

impl PartitionKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Counter document for this day, keyed `queue_<date>`
    pub fn counter_doc(&self) -> DocPath {
        CollectionPath::new("counters").doc(format!("queue_{}", self))
    }

    /// Canonical per-day entries collection
    pub fn entries_collection(&self) -> CollectionPath {
        CollectionPath::new(format!("queue/{}/entries", self))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for PartitionKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// The flat legacy projection collection
pub fn completions_collection() -> CollectionPath {
    CollectionPath::new("document-completions")
}

/// Human-displayed queue number: date prefix plus zero-padded sequence
///
/// Padding widens but never truncates: sequence 7 formats as `Q07`,
/// sequence 123 as `Q123`.
pub fn format_queue_number(partition: PartitionKey, sequence: u32) -> String {
    format!("{}-Q{:02}", partition, sequence)
}

/// Visitor state within the day's queue
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntryStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

/// What the kiosk form collects before a number is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorPayload {
    pub visitor_name: String,
    #[serde(default)]
    pub completed_steps: BTreeMap<String, bool>,
}

impl VisitorPayload {
    pub fn new(visitor_name: impl Into<String>) -> Self {
        Self {
            visitor_name: visitor_name.into(),
            completed_steps: BTreeMap::new(),
        }
    }
}

/// Per-day allocation counter, mutated only inside allocator transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub last_number: u32,
    pub date: PartitionKey,
    pub updated_at: DateTime<Utc>,
}

impl Counter {
    /// Last issued number from a counter document; 0 when the counter does
    /// not exist yet (first allocation of the day)
    pub fn last_number_in(doc: Option<&Document>) -> u32 {
        doc.and_then(|d| d.get("last_number"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    }
}

/// One visitor's place in a day's queue
///
/// `sequence_number` and `formatted_number` are immutable once assigned;
/// only `status` (and `updated_at`) change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(skip)]
    pub id: String,
    pub partition_key: PartitionKey,
    pub sequence_number: u32,
    pub formatted_number: String,
    pub visitor_name: String,
    pub status: EntryStatus,
    pub completed_steps: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn to_document(&self) -> StoreResult<Document> {
        crate::store::doc_from(self)
    }

    pub fn from_document(id: &str, doc: Document) -> StoreResult<Self> {
        let mut entry: QueueEntry = serde_json::from_value(serde_json::Value::Object(doc))
            .map_err(|e| StoreError::InvalidDocument {
                message: format!("queue entry {}: {}", id, e),
            })?;
        entry.id = id.to_string();
        Ok(entry)
    }
}

/// Denormalized copy of a queue entry in the legacy record shape
///
/// `queue_number` and `queue_id` keep the field names the existing admin
/// dashboard aggregates over. Written atomically with the canonical entry;
/// afterwards only best-effort status sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionProjection {
    pub queue_number: u32,
    pub queue_id: String,
    pub visitor_name: String,
    pub status: EntryStatus,
    pub completed_steps: BTreeMap<String, bool>,
    pub date: PartitionKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub record_type: String,
}

impl CompletionProjection {
    pub fn from_entry(entry: &QueueEntry) -> Self {
        Self {
            queue_number: entry.sequence_number,
            queue_id: entry.formatted_number.clone(),
            visitor_name: entry.visitor_name.clone(),
            status: entry.status,
            completed_steps: entry.completed_steps.clone(),
            date: entry.partition_key,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            record_type: DOCUMENT_COMPLETION_TYPE.to_string(),
        }
    }

    pub fn to_document(&self) -> StoreResult<Document> {
        crate::store::doc_from(self)
    }
}
