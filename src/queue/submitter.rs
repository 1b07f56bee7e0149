//! Resilient submission pipeline
//!
//! Wraps the combined-transaction commit with a retry/backoff envelope, a
//! connectivity probe for constrained-network clients, a fresh-session
//! fallback attempt, and a local emergency capture as the last resort.
//! Submissions from one client are strictly sequential: a second submit
//! while one is in flight is a no-op, which is what stops double-clicks
//! from allocating two numbers.
//!
//! Known open risk, deliberately not papered over: there is no idempotency
//! key, so a retry after an ambiguous failure (commit succeeded but the
//! acknowledgment was lost) may allocate a second number for the same
//! visitor.

use crate::core::retry::{retry_async_gated, RetryPolicy};
use crate::core::time::TimeProvider;
use crate::queue::writer::{CommittedEntry, QueueRecordWriter};
use crate::queue::{PartitionKey, QueueError, QueueResult, VisitorPayload};
use crate::storage::EmergencyBackupLog;
use crate::store::DocumentStore;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Submission lifecycle, logged at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Retrying,
    FallbackAttempt,
    Succeeded,
    PermanentlyFailed,
}

/// What a submission attempt produced
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Both records are durably committed under the returned number
    Committed(CommittedEntry),
    /// Every remote path failed; the payload sits in local storage awaiting
    /// sync. A qualified success: the visit is recorded somewhere, just not
    /// yet server-visible, and no sequence number was assigned.
    SavedLocally { local_id: String },
    /// Another submission from this client is still in flight; nothing was
    /// allocated or written
    InFlight,
}

/// Client characteristics that shape the retry envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientProfile {
    /// Mobile-grade connectivity: probe the store before each retry instead
    /// of hammering a link that may still be down
    pub constrained_network: bool,
}

pub struct ResilientSubmitter {
    store: Arc<dyn DocumentStore>,
    writer: QueueRecordWriter,
    backup: EmergencyBackupLog,
    policy: RetryPolicy,
    profile: ClientProfile,
    time: Arc<dyn TimeProvider>,
    in_flight: AsyncMutex<()>,
    state: Mutex<SubmitState>,
}

impl ResilientSubmitter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backup: EmergencyBackupLog,
        policy: RetryPolicy,
        profile: ClientProfile,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            writer: QueueRecordWriter::new(Arc::clone(&store)),
            store,
            backup,
            policy,
            profile,
            time,
            in_flight: AsyncMutex::new(()),
            state: Mutex::new(SubmitState::Idle),
        }
    }

    #[cfg(test)]
    pub(crate) fn try_hold_in_flight(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, ()>, tokio::sync::TryLockError> {
        self.in_flight.try_lock()
    }

    /// Last observed lifecycle state
    pub fn state(&self) -> SubmitState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: SubmitState) {
        let mut state = self.state.lock().unwrap();
        if *state != next {
            log::debug!("Submission state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    async fn probe_connectivity(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(source) => {
                // Gates the retry; becomes user-visible only if the whole
                // budget runs out afterwards.
                let err = QueueError::ConnectivityFailure { source };
                log::debug!("{}", err);
                false
            }
        }
    }

    /// Submit one visitor, assigning the next number for today's queue
    ///
    /// Today's partition key is recomputed per call, so the sequence resets
    /// at local midnight without any timer bookkeeping.
    pub async fn submit(&self, payload: &VisitorPayload) -> QueueResult<SubmitOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::debug!(
                "Ignoring submission for '{}': another submission is in flight",
                payload.visitor_name
            );
            return Ok(SubmitOutcome::InFlight);
        };

        let partition = PartitionKey::new(self.time.today());
        self.set_state(SubmitState::Submitting);

        let attempt_result = retry_async_gated(
            "queue_submit",
            self.policy.clone(),
            || async {
                self.set_state(SubmitState::Retrying);
                if self.profile.constrained_network {
                    self.probe_connectivity().await
                } else {
                    true
                }
            },
            || async {
                self.set_state(SubmitState::Submitting);
                self.writer.commit_next(partition, payload).await
            },
        )
        .await;

        match attempt_result {
            Ok(committed) => {
                self.set_state(SubmitState::Succeeded);
                Ok(SubmitOutcome::Committed(committed))
            }
            Err(err) => {
                log::warn!(
                    "All {} submission attempts failed for '{}': {}",
                    self.policy.max_attempts,
                    payload.visitor_name,
                    err
                );
                self.fallback(partition, payload).await
            }
        }
    }

    /// Alternate write path after the retry budget: force a fresh store
    /// session and try once more; failing that, capture locally.
    async fn fallback(
        &self,
        partition: PartitionKey,
        payload: &VisitorPayload,
    ) -> QueueResult<SubmitOutcome> {
        self.set_state(SubmitState::FallbackAttempt);

        match self.store.refresh().await {
            Ok(()) => match self.writer.commit_next(partition, payload).await {
                Ok(committed) => {
                    log::info!(
                        "Fallback commit succeeded for '{}' after session refresh",
                        payload.visitor_name
                    );
                    self.set_state(SubmitState::Succeeded);
                    return Ok(SubmitOutcome::Committed(committed));
                }
                Err(e) => log::warn!("Fallback commit failed: {}", e),
            },
            Err(e) => log::warn!("Store session refresh failed: {}", e),
        }

        let captured = serde_json::to_value(payload).expect("visitor payload serializes to JSON");
        match self.backup.append(captured, self.time.now_utc()) {
            Ok(local_id) => {
                // Degraded success: the visit is recorded on the device.
                self.set_state(SubmitState::Succeeded);
                Ok(SubmitOutcome::SavedLocally { local_id })
            }
            Err(source) => {
                self.set_state(SubmitState::PermanentlyFailed);
                Err(QueueError::LocalFallbackFailure { source })
            }
        }
    }
}
