//! Kiosk and admin submission flows
//!
//! Both modes run the same resilient submission pipeline and differ only in
//! how the result is presented: the kiosk speaks to the visitor, admin mode
//! to the front-desk operator. The mode is picked by config at composition
//! time.

use crate::core::time::TimeProvider;
use crate::queue::{
    PartitionKey, QueueResult, ResilientSubmitter, StatsAggregator, SubmitOutcome, VisitorPayload,
};
use async_trait::async_trait;
use std::sync::Arc;

use super::config::SubmissionMode;

/// One visitor submission, rendered for whoever is looking at the screen
#[async_trait]
pub trait SubmissionFlow: Send + Sync {
    async fn submit(&self, payload: &VisitorPayload) -> QueueResult<String>;
}

/// Visitor-facing flow: friendly lines, no internals
pub struct KioskFlow {
    submitter: Arc<ResilientSubmitter>,
}

impl KioskFlow {
    pub fn new(submitter: Arc<ResilientSubmitter>) -> Self {
        Self { submitter }
    }
}

#[async_trait]
impl SubmissionFlow for KioskFlow {
    async fn submit(&self, payload: &VisitorPayload) -> QueueResult<String> {
        let outcome = self.submitter.submit(payload).await?;
        Ok(match outcome {
            SubmitOutcome::Committed(committed) => format!(
                "Welcome, {}! Your queue number is {}.",
                payload.visitor_name, committed.formatted_number
            ),
            SubmitOutcome::SavedLocally { .. } => format!(
                "Welcome, {}! Your visit is recorded; a number will be assigned at the desk.",
                payload.visitor_name
            ),
            SubmitOutcome::InFlight => {
                "One moment, a submission is already in progress.".to_string()
            }
        })
    }
}

/// Operator-facing flow: entry ids, backup ids and live queue counts
pub struct AdminFlow {
    submitter: Arc<ResilientSubmitter>,
    stats: StatsAggregator,
    time: Arc<dyn TimeProvider>,
}

impl AdminFlow {
    pub fn new(
        submitter: Arc<ResilientSubmitter>,
        stats: StatsAggregator,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            submitter,
            stats,
            time,
        }
    }
}

#[async_trait]
impl SubmissionFlow for AdminFlow {
    async fn submit(&self, payload: &VisitorPayload) -> QueueResult<String> {
        let outcome = self.submitter.submit(payload).await?;
        Ok(match outcome {
            SubmitOutcome::Committed(committed) => {
                let partition = PartitionKey::new(self.time.today());
                let stats = self.stats.stats_for(partition).await;
                format!(
                    "{} -> {} (entry {}); waiting {}, total {}",
                    payload.visitor_name,
                    committed.formatted_number,
                    committed.entry_id,
                    stats.waiting,
                    stats.total
                )
            }
            SubmitOutcome::SavedLocally { local_id } => format!(
                "{} captured locally as {} (store unreachable, pending sync)",
                payload.visitor_name, local_id
            ),
            SubmitOutcome::InFlight => {
                format!("{} ignored: submission already in flight", payload.visitor_name)
            }
        })
    }
}

/// Pick the flow for the configured mode
pub fn build_flow(
    mode: SubmissionMode,
    submitter: Arc<ResilientSubmitter>,
    stats: StatsAggregator,
    time: Arc<dyn TimeProvider>,
) -> Box<dyn SubmissionFlow> {
    match mode {
        SubmissionMode::Kiosk => Box::new(KioskFlow::new(submitter)),
        SubmissionMode::Admin => Box::new(AdminFlow::new(submitter, stats, time)),
    }
}
