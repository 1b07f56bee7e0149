//! Atomic queue record commits
//!
//! Every committed submission produces two documents: the canonical
//! QueueEntry under the day's entries collection and a legacy-shaped
//! CompletionProjection in the flat `document-completions` collection.
//! Both become visible together or not at all, so a dashboard can never
//! observe one without the other.
//!
//! Two commit forms exist:
//! - `commit_next` runs allocation and both record writes in one store
//!   transaction; a number is never issued without its entry, which closes
//!   the burned-number gap of the decoupled form. All production
//!   submissions go through this.
//! - `commit` takes an already-allocated number and batch-writes the two
//!   records; kept as the backward-compatible building block.

use crate::queue::{
    completions_collection, format_queue_number, CompletionProjection, Counter, EntryStatus,
    PartitionKey, QueueEntry, QueueError, QueueResult, VisitorPayload,
};
use crate::store::{doc_from, DocumentStore, StoreError, TxOutcome};
use std::sync::Arc;

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEntry {
    pub entry_id: String,
    pub sequence_number: u32,
    pub formatted_number: String,
}

pub struct QueueRecordWriter {
    store: Arc<dyn DocumentStore>,
}

impl QueueRecordWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn build_entry(
        partition: PartitionKey,
        entry_id: &str,
        sequence_number: u32,
        payload: &VisitorPayload,
        now: chrono::DateTime<chrono::Utc>,
    ) -> QueueEntry {
        QueueEntry {
            id: entry_id.to_string(),
            partition_key: partition,
            sequence_number,
            formatted_number: format_queue_number(partition, sequence_number),
            visitor_name: payload.visitor_name.clone(),
            status: EntryStatus::Waiting,
            completed_steps: payload.completed_steps.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Decoupled form: write both records for an already-allocated number
    ///
    /// Atomic multi-document write; fails with `WriteFailure` and the caller
    /// must not assume partial success. The allocated number is burned if
    /// this never succeeds.
    pub async fn commit(
        &self,
        partition: PartitionKey,
        sequence_number: u32,
        payload: &VisitorPayload,
    ) -> QueueResult<CommittedEntry> {
        let entry_id = self.store.generate_id();
        let projection_id = self.store.generate_id();
        let now = self.store.server_time();

        let entry = Self::build_entry(partition, &entry_id, sequence_number, payload, now);
        let projection = CompletionProjection::from_entry(&entry);

        let writes = vec![
            (
                partition.entries_collection().doc(&entry_id),
                entry.to_document()?,
            ),
            (
                completions_collection().doc(projection_id),
                projection.to_document()?,
            ),
        ];
        self.store
            .batch_write(writes)
            .await
            .map_err(|source| QueueError::WriteFailure { source })?;

        log::info!(
            "Committed queue entry {} ({})",
            entry.formatted_number,
            entry_id
        );
        Ok(CommittedEntry {
            entry_id,
            sequence_number,
            formatted_number: entry.formatted_number,
        })
    }

    /// Combined form: allocate and commit in a single transaction
    ///
    /// The counter read-modify-write and both record writes commit as one
    /// atomic unit, so allocation order equals visible-commit order and a
    /// crash can never burn a number.
    pub async fn commit_next(
        &self,
        partition: PartitionKey,
        payload: &VisitorPayload,
    ) -> QueueResult<CommittedEntry> {
        let anchor = partition.counter_doc();
        let entry_id = self.store.generate_id();
        let projection_id = self.store.generate_id();
        let now = self.store.server_time();

        let tx_anchor = anchor.clone();
        let tx_entry_id = entry_id.clone();
        let tx_projection_id = projection_id;
        let tx_payload = payload.clone();

        let sequence_number = self
            .store
            .run_transaction(
                anchor,
                Box::new(move |current| {
                    let next = Counter::last_number_in(current) + 1;
                    let counter = Counter {
                        last_number: next,
                        date: partition,
                        updated_at: now,
                    };
                    let entry =
                        Self::build_entry(partition, &tx_entry_id, next, &tx_payload, now);
                    let projection = CompletionProjection::from_entry(&entry);
                    Ok(TxOutcome {
                        value: u64::from(next),
                        writes: vec![
                            (tx_anchor.clone(), doc_from(&counter)?),
                            (
                                partition.entries_collection().doc(entry.id.clone()),
                                entry.to_document()?,
                            ),
                            (
                                completions_collection().doc(tx_projection_id.clone()),
                                projection.to_document()?,
                            ),
                        ],
                    })
                }),
            )
            .await
            .map_err(|source| match source {
                StoreError::Contention { .. } => QueueError::AllocationFailure { partition, source },
                other => QueueError::WriteFailure { source: other },
            })? as u32;

        let formatted_number = format_queue_number(partition, sequence_number);
        log::info!("Committed queue entry {} ({})", formatted_number, entry_id);
        Ok(CommittedEntry {
            entry_id,
            sequence_number,
            formatted_number,
        })
    }

    /// Administrative status mutation with best-effort projection sync
    ///
    /// The canonical entry is updated transactionally; the matching
    /// projection (found by its `queue_id`) is synced afterwards and a
    /// failure there only logs, per the projection's best-effort contract.
    pub async fn update_status(
        &self,
        partition: PartitionKey,
        entry_id: &str,
        status: EntryStatus,
    ) -> QueueResult<()> {
        let path = partition.entries_collection().doc(entry_id);
        let now = self.store.server_time();

        let current = self.store.get(&path).await?.ok_or_else(|| {
            QueueError::WriteFailure {
                source: StoreError::OperationFailed {
                    message: format!("queue entry {} not found", path),
                },
            }
        })?;
        let entry = QueueEntry::from_document(entry_id, current)?;

        let tx_path = path.clone();
        self.store
            .run_transaction(
                path,
                Box::new(move |current| {
                    let mut doc = current.cloned().ok_or(StoreError::OperationFailed {
                        message: "queue entry disappeared mid-update".to_string(),
                    })?;
                    doc.insert("status".to_string(), serde_json::json!(status));
                    doc.insert("updated_at".to_string(), serde_json::json!(now));
                    Ok(TxOutcome {
                        value: 0,
                        writes: vec![(tx_path.clone(), doc)],
                    })
                }),
            )
            .await
            .map_err(|source| QueueError::WriteFailure { source })?;

        log::debug!(
            "Queue entry {} status -> {} ({})",
            entry.formatted_number,
            status,
            entry_id
        );

        if let Err(e) = self.sync_projection_status(&entry.formatted_number, status, now).await {
            log::warn!(
                "Projection status sync for {} failed (best-effort): {}",
                entry.formatted_number,
                e
            );
        }
        Ok(())
    }

    async fn sync_projection_status(
        &self,
        queue_id: &str,
        status: EntryStatus,
        now: chrono::DateTime<chrono::Utc>,
    ) -> QueueResult<()> {
        let collection = completions_collection();
        let mut writes = Vec::new();
        for (id, mut doc) in self.store.query(&collection).await? {
            if doc.get("queue_id").and_then(|v| v.as_str()) == Some(queue_id) {
                doc.insert("status".to_string(), serde_json::json!(status));
                doc.insert("updated_at".to_string(), serde_json::json!(now));
                writes.push((collection.doc(id), doc));
            }
        }
        if !writes.is_empty() {
            self.store.batch_write(writes).await?;
        }
        Ok(())
    }
}
