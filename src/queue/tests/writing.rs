//! Tests for atomic dual-write record commits

#[cfg(test)]
mod tests {
    use crate::queue::{
        completions_collection, EntryStatus, PartitionKey, QueueEntry, QueueError,
        QueueRecordWriter, VisitorPayload, DOCUMENT_COMPLETION_TYPE,
    };
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn day(y: i32, m: u32, d: u32) -> PartitionKey {
        PartitionKey::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn payload(name: &str) -> VisitorPayload {
        let mut p = VisitorPayload::new(name);
        p.completed_steps.insert("id-check".to_string(), true);
        p
    }

    #[tokio::test]
    async fn test_commit_writes_entry_and_projection_together() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        let committed = writer.commit(key, 4, &payload("Ana Silva")).await.unwrap();
        assert_eq!(committed.sequence_number, 4);
        assert_eq!(committed.formatted_number, "2026-03-07-Q04");

        let entries = store.query(&key.entries_collection()).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = QueueEntry::from_document(&entries[0].0, entries[0].1.clone()).unwrap();
        assert_eq!(entry.visitor_name, "Ana Silva");
        assert_eq!(entry.status, EntryStatus::Waiting);
        assert_eq!(entry.formatted_number, "2026-03-07-Q04");

        let completions = store.query(&completions_collection()).await.unwrap();
        assert_eq!(completions.len(), 1);
        let projection = &completions[0].1;
        assert_eq!(
            projection.get("queue_number").and_then(|v| v.as_u64()),
            Some(4)
        );
        assert_eq!(
            projection.get("queue_id").and_then(|v| v.as_str()),
            Some("2026-03-07-Q04")
        );
        assert_eq!(
            projection.get("type").and_then(|v| v.as_str()),
            Some(DOCUMENT_COMPLETION_TYPE)
        );
    }

    #[tokio::test]
    async fn test_failed_commit_writes_neither_record() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        assert!(writer.commit(key, 1, &payload("Ana Silva")).await.is_err());

        store.set_offline(false);
        assert!(store.query(&key.entries_collection()).await.unwrap().is_empty());
        assert!(store.query(&completions_collection()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_next_allocates_and_writes_atomically() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        let first = writer.commit_next(key, &payload("Ana Silva")).await.unwrap();
        let second = writer.commit_next(key, &payload("Ben Okafor")).await.unwrap();
        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);

        // Counter, entry and projection all landed
        let counter = store.get(&key.counter_doc()).await.unwrap().unwrap();
        assert_eq!(counter.get("last_number").and_then(|v| v.as_u64()), Some(2));
        assert_eq!(store.query(&key.entries_collection()).await.unwrap().len(), 2);
        assert_eq!(store.query(&completions_collection()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_next_burns_no_number() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        store.fail_next_transactions(1);
        assert!(writer.commit_next(key, &payload("Ana Silva")).await.is_err());

        // The number from the failed attempt is reissued, not skipped
        let committed = writer.commit_next(key, &payload("Ana Silva")).await.unwrap();
        assert_eq!(committed.sequence_number, 1);
    }

    #[tokio::test]
    async fn test_contention_abort_maps_to_allocation_failure() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        store.fail_next_transactions_with_contention(1);
        let err = writer
            .commit_next(key, &payload("Ana Silva"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::AllocationFailure { .. }));

        // Aborted allocation burns nothing
        let committed = writer.commit_next(key, &payload("Ana Silva")).await.unwrap();
        assert_eq!(committed.sequence_number, 1);
    }

    #[tokio::test]
    async fn test_update_status_syncs_entry_and_projection() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        let committed = writer.commit_next(key, &payload("Ana Silva")).await.unwrap();
        writer
            .update_status(key, &committed.entry_id, EntryStatus::InProgress)
            .await
            .unwrap();

        let entry_doc = store
            .get(&key.entries_collection().doc(&committed.entry_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            entry_doc.get("status").and_then(|v| v.as_str()),
            Some("in-progress")
        );

        let completions = store.query(&completions_collection()).await.unwrap();
        assert_eq!(
            completions[0].1.get("status").and_then(|v| v.as_str()),
            Some("in-progress")
        );
    }

    #[tokio::test]
    async fn test_update_status_of_unknown_entry_fails() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(store);
        let err = writer
            .update_status(day(2026, 3, 7), "no-such-entry", EntryStatus::Completed)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no-such-entry"));
    }

    #[tokio::test]
    async fn test_sequence_and_formatted_number_agree() {
        let store = Arc::new(MemoryStore::new());
        let writer = QueueRecordWriter::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);

        for _ in 0..3 {
            writer.commit_next(key, &payload("Ana Silva")).await.unwrap();
        }
        for (id, doc) in store.query(&key.entries_collection()).await.unwrap() {
            let entry = QueueEntry::from_document(&id, doc).unwrap();
            assert_eq!(
                entry.formatted_number,
                format!("{}-Q{:02}", key, entry.sequence_number)
            );
        }
    }
}
