//! Date-scoped sequence allocation against the counter document
//!
//! One Counter document per calendar day is the single point of mutual
//! exclusion. Allocation is a store transaction: read `last_number` (0 when
//! the counter does not exist yet), write back `last_number + 1` in the same
//! atomic unit, return it. Contention is retried inside the store, never by
//! the caller, so two concurrent allocators can never receive the same
//! number for the same day.

use crate::queue::{Counter, PartitionKey, QueueError, QueueResult};
use crate::store::{doc_from, DocumentStore, TxOutcome};
use std::sync::Arc;

pub struct SequenceAllocator {
    store: Arc<dyn DocumentStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Allocate the next sequence number for the given day
    ///
    /// Numbers are issued as 1, 2, 3, ... in allocation order. Fails with
    /// `AllocationFailure` once the store's internal retry budget is
    /// exhausted; no queue entry has been written for the attempt in that
    /// case.
    pub async fn allocate(&self, partition: PartitionKey) -> QueueResult<u32> {
        let anchor = partition.counter_doc();
        let updated_at = self.store.server_time();
        let tx_anchor = anchor.clone();

        let next = self
            .store
            .run_transaction(
                anchor,
                Box::new(move |current| {
                    let next = Counter::last_number_in(current) + 1;
                    let counter = Counter {
                        last_number: next,
                        date: partition,
                        updated_at,
                    };
                    Ok(TxOutcome {
                        value: u64::from(next),
                        writes: vec![(tx_anchor.clone(), doc_from(&counter)?)],
                    })
                }),
            )
            .await
            .map_err(|source| QueueError::AllocationFailure { partition, source })?;

        log::debug!("Allocated queue number {} for {}", next, partition);
        Ok(next as u32)
    }
}
