//! Visitor queue core
//!
//! Everything between the kiosk form and the document store: date-scoped
//! sequence allocation with a per-day counter document, atomic dual-write
//! record commits (canonical entry plus a legacy-shaped projection),
//! retry/backoff submission with a local emergency fallback, live ordered
//! snapshot fan-out to dashboards, and read-only stats aggregation.
//!
//! # Architecture
//!
//! ```text
//! kiosk form ──▶ ResilientSubmitter ──▶ QueueRecordWriter ──▶ DocumentStore
//!                      │                      │                    │
//!                      │ (all remote          │ combined tx:       │ change
//!                      │  paths failed)       │ counter RMW +      │ notices
//!                      ▼                      │ entry + projection ▼
//!               EmergencyBackupLog            │             QueueObserver
//!                (local storage)              │                    │
//!                                             │                    ▼
//!                              SequenceAllocator          dashboards / boards
//!                              (standalone counter RMW)
//! ```

mod allocator;
mod error;
mod observer;
mod stats;
mod submitter;
mod types;
mod writer;

pub use allocator::SequenceAllocator;
pub use error::{QueueError, QueueResult};
pub use observer::{QueueObserver, QueueSnapshot, Subscription};
pub use stats::{QueueStats, StatsAggregator};
pub use submitter::{ClientProfile, ResilientSubmitter, SubmitOutcome, SubmitState};
pub use types::{
    completions_collection, format_queue_number, CompletionProjection, Counter, EntryStatus,
    PartitionKey, QueueEntry, VisitorPayload, DOCUMENT_COMPLETION_TYPE,
};
pub use writer::{CommittedEntry, QueueRecordWriter};

#[cfg(test)]
mod tests;
