//! Read-side aggregation over queue partitions and completion records

use crate::queue::{completions_collection, EntryStatus, PartitionKey, QueueEntry};
use crate::store::DocumentStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Counts for one day's queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Highest sequence number handed out so far, 0 when the day is empty
    pub last_number: u32,
}

/// Computes summary statistics from the store's current state
///
/// All reads degrade to empty results on store failure; statistics are
/// advisory and must never block kiosk operation.
pub struct StatsAggregator {
    store: Arc<dyn DocumentStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn stats_for(&self, partition: PartitionKey) -> QueueStats {
        let raw = match self.store.query(&partition.entries_collection()).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Stats query for {} failed: {}", partition, e);
                return QueueStats::default();
            }
        };
        let mut stats = QueueStats::default();
        for (id, doc) in raw {
            let entry = match QueueEntry::from_document(&id, doc) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping malformed queue entry {} in stats: {}", id, e);
                    continue;
                }
            };
            stats.total += 1;
            match entry.status {
                EntryStatus::Waiting => stats.waiting += 1,
                EntryStatus::InProgress => stats.in_progress += 1,
                EntryStatus::Completed => stats.completed += 1,
                EntryStatus::Cancelled => stats.cancelled += 1,
            }
            stats.last_number = stats.last_number.max(entry.sequence_number);
        }
        stats
    }

    /// Completion records bucketed by their partition date, oldest first
    pub async fn completions_by_day(&self) -> BTreeMap<String, usize> {
        let raw = match self.store.query(&completions_collection()).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Completion history query failed: {}", e);
                return BTreeMap::new();
            }
        };
        let mut buckets = BTreeMap::new();
        for (id, doc) in raw {
            match doc.get("date").and_then(|v| v.as_str()) {
                Some(date) => *buckets.entry(date.to_string()).or_insert(0) += 1,
                None => log::warn!("Completion record {} has no date field", id),
            }
        }
        buckets
    }
}
