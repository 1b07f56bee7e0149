//! Tests for gap-free date-scoped sequence allocation

#[cfg(test)]
mod tests {
    use crate::queue::{PartitionKey, SequenceAllocator};
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    fn day(y: i32, m: u32, d: u32) -> PartitionKey {
        PartitionKey::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[tokio::test]
    async fn test_first_allocation_of_a_day_is_one() {
        let store = Arc::new(MemoryStore::new());
        let allocator = SequenceAllocator::new(store);
        assert_eq!(allocator.allocate(day(2026, 3, 7)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sequential_allocations_are_consecutive() {
        let store = Arc::new(MemoryStore::new());
        let allocator = SequenceAllocator::new(store);
        let key = day(2026, 3, 7);
        for expected in 1..=5 {
            assert_eq!(allocator.allocate(key).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_partitions_count_independently() {
        let store = Arc::new(MemoryStore::new());
        let allocator = SequenceAllocator::new(store);
        let monday = day(2026, 3, 9);
        let tuesday = day(2026, 3, 10);

        assert_eq!(allocator.allocate(monday).await.unwrap(), 1);
        assert_eq!(allocator.allocate(monday).await.unwrap(), 2);
        // A new day starts over at 1; the old day is unaffected
        assert_eq!(allocator.allocate(tuesday).await.unwrap(), 1);
        assert_eq!(allocator.allocate(monday).await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_allocations_are_gap_free() {
        let store = Arc::new(MemoryStore::new());
        let key = day(2026, 3, 7);
        let task_count = 32u32;

        let mut tasks = JoinSet::new();
        for _ in 0..task_count {
            let allocator = SequenceAllocator::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
            tasks.spawn(async move { allocator.allocate(key).await.unwrap() });
        }

        let mut issued = BTreeSet::new();
        while let Some(result) = tasks.join_next().await {
            // Duplicate numbers would collapse the set
            assert!(issued.insert(result.unwrap()));
        }

        let expected: BTreeSet<u32> = (1..=task_count).collect();
        assert_eq!(issued, expected);
    }

    #[tokio::test]
    async fn test_counter_document_tracks_last_number() {
        let store = Arc::new(MemoryStore::new());
        let allocator = SequenceAllocator::new(Arc::clone(&store) as Arc<dyn DocumentStore>);
        let key = day(2026, 3, 7);
        allocator.allocate(key).await.unwrap();
        allocator.allocate(key).await.unwrap();

        let counter = store.get(&key.counter_doc()).await.unwrap().unwrap();
        assert_eq!(counter.get("last_number").and_then(|v| v.as_u64()), Some(2));
        assert_eq!(
            counter.get("date").and_then(|v| v.as_str()),
            Some("2026-03-07")
        );
    }

    #[tokio::test]
    async fn test_allocation_failure_when_store_is_offline() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let allocator = SequenceAllocator::new(Arc::clone(&store) as Arc<dyn DocumentStore>);

        let err = allocator.allocate(day(2026, 3, 7)).await.unwrap_err();
        assert!(err.to_string().contains("2026-03-07"));

        // Nothing was issued: once back online the day still starts at 1
        store.set_offline(false);
        assert_eq!(allocator.allocate(day(2026, 3, 7)).await.unwrap(), 1);
    }
}
