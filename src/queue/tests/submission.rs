//! Tests for the resilient submission pipeline and its fallback ladder

#[cfg(test)]
mod tests {
    use crate::core::retry::{Backoff, RetryPolicy};
    use crate::core::time::MockTimeProvider;
    use crate::queue::{
        completions_collection, ClientProfile, QueueError, ResilientSubmitter, SubmitOutcome,
        SubmitState, VisitorPayload,
    };
    use crate::storage::{EmergencyBackupLog, KeyValueStorage, MemoryStorage};
    use crate::store::{DocumentStore, MemoryStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff: Backoff::Exponential,
        }
    }

    fn mock_time() -> Arc<MockTimeProvider> {
        Arc::new(MockTimeProvider::at(
            Utc.with_ymd_and_hms(2026, 3, 7, 9, 30, 0).unwrap(),
        ))
    }

    fn submitter_with(
        store: Arc<MemoryStore>,
        profile: ClientProfile,
    ) -> (ResilientSubmitter, Arc<MemoryStorage>) {
        let local = Arc::new(MemoryStorage::new());
        let backup = EmergencyBackupLog::new(Arc::clone(&local) as Arc<dyn KeyValueStorage>);
        let submitter = ResilientSubmitter::new(
            store as Arc<dyn DocumentStore>,
            backup,
            fast_policy(),
            profile,
            mock_time(),
        );
        (submitter, local)
    }

    #[tokio::test]
    async fn test_healthy_submission_commits_first_try() {
        let store = Arc::new(MemoryStore::new());
        let (submitter, _) = submitter_with(Arc::clone(&store), ClientProfile::default());

        let outcome = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap();
        let SubmitOutcome::Committed(committed) = outcome else {
            panic!("expected committed outcome, got {:?}", outcome);
        };
        assert_eq!(committed.sequence_number, 1);
        assert_eq!(committed.formatted_number, "2026-03-07-Q01");
        assert_eq!(submitter.state(), SubmitState::Succeeded);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_to_success() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_transactions(2);
        let (submitter, _) = submitter_with(Arc::clone(&store), ClientProfile::default());

        let outcome = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Committed(_)));
        assert_eq!(store.injected_failures_remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_through_to_session_refresh() {
        let store = Arc::new(MemoryStore::new());
        // All three retry-budget attempts fail, the post-refresh attempt
        // succeeds
        store.fail_next_transactions(3);
        let (submitter, local) = submitter_with(Arc::clone(&store), ClientProfile::default());

        let outcome = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap();
        let SubmitOutcome::Committed(committed) = outcome else {
            panic!("expected fallback commit, got {:?}", outcome);
        };
        assert_eq!(committed.sequence_number, 1);
        assert_eq!(store.injected_failures_remaining(), 0);
        // Nothing reached the emergency log
        assert!(local.get("emergency_submissions").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_outage_healed_by_refresh_commits_on_fallback() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        store.arm_heal_on_refresh();
        let (submitter, _) = submitter_with(Arc::clone(&store), ClientProfile::default());

        let outcome = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Committed(_)));
        assert_eq!(submitter.state(), SubmitState::Succeeded);
    }

    #[tokio::test]
    async fn test_total_outage_saves_locally() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let (submitter, _) = submitter_with(Arc::clone(&store), ClientProfile::default());

        let payload = VisitorPayload::new("Ana Silva");
        let outcome = submitter.submit(&payload).await.unwrap();
        let SubmitOutcome::SavedLocally { local_id } = outcome else {
            panic!("expected local capture, got {:?}", outcome);
        };
        // Degraded success, not a failure state
        assert_eq!(submitter.state(), SubmitState::Succeeded);

        // Nothing was committed remotely, no number was assigned
        store.set_offline(false);
        assert!(store.query(&completions_collection()).await.unwrap().is_empty());
        assert!(!local_id.is_empty());
    }

    #[tokio::test]
    async fn test_locally_saved_payload_is_replayable() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);

        let local = Arc::new(MemoryStorage::new());
        let backup = EmergencyBackupLog::new(Arc::clone(&local) as Arc<dyn KeyValueStorage>);
        let submitter = ResilientSubmitter::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            backup,
            fast_policy(),
            ClientProfile::default(),
            mock_time(),
        );

        let mut payload = VisitorPayload::new("Ana Silva");
        payload.completed_steps.insert("id-check".to_string(), true);
        let outcome = submitter.submit(&payload).await.unwrap();
        let SubmitOutcome::SavedLocally { local_id } = outcome else {
            panic!("expected local capture, got {:?}", outcome);
        };

        let reread = EmergencyBackupLog::new(Arc::clone(&local) as Arc<dyn KeyValueStorage>);
        let pending = reread.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_id, local_id);
        assert!(!pending[0].synced);
        let replayed: VisitorPayload =
            serde_json::from_value(pending[0].payload.clone()).unwrap();
        assert_eq!(replayed, payload);
    }

    #[tokio::test]
    async fn test_constrained_profile_probes_before_each_retry() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_transactions(1);
        let (submitter, _) = submitter_with(
            Arc::clone(&store),
            ClientProfile {
                constrained_network: true,
            },
        );

        // Store is online, so the probe passes and the retry commits
        let outcome = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Committed(_)));
    }

    #[tokio::test]
    async fn test_overlapping_submission_is_rejected_without_allocation() {
        let store = Arc::new(MemoryStore::new());
        let (submitter, _) = submitter_with(Arc::clone(&store), ClientProfile::default());

        // Occupy the in-flight slot the way a pending submission would
        let _guard = submitter.try_hold_in_flight().unwrap();
        let outcome = submitter
            .submit(&VisitorPayload::new("Ben Okafor"))
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::InFlight);

        // Nothing was written for the rejected click
        assert!(store
            .query(&completions_collection())
            .await
            .unwrap()
            .is_empty());
    }

    /// Storage that rejects every write, for exercising the dead-end path
    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get(&self, key: &str) -> crate::storage::StorageResult<Option<String>> {
            Err(crate::storage::StorageError::Corrupt {
                key: key.to_string(),
                message: "storage medium failed".to_string(),
            })
        }

        fn set(&self, key: &str, _value: &str) -> crate::storage::StorageResult<()> {
            Err(crate::storage::StorageError::Corrupt {
                key: key.to_string(),
                message: "storage medium failed".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_local_capture_is_a_permanent_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);

        let backup = EmergencyBackupLog::new(Arc::new(BrokenStorage));
        let submitter = ResilientSubmitter::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            backup,
            fast_policy(),
            ClientProfile::default(),
            mock_time(),
        );

        let err = submitter
            .submit(&VisitorPayload::new("Ana Silva"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::LocalFallbackFailure { .. }));
        assert_eq!(submitter.state(), SubmitState::PermanentlyFailed);
    }
}
