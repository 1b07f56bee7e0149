//! The `DocumentStore` trait: the seam between the queue core and its backend

use crate::store::{CollectionPath, DocPath, Document, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Result of a transaction closure: the value to return to the caller plus
/// the write set to commit atomically with the anchor-document check
pub struct TxOutcome {
    pub value: u64,
    pub writes: Vec<(DocPath, Document)>,
}

/// Transaction body: receives the current anchor document (None when absent)
/// and produces the writes to commit. May run more than once under
/// contention, so it must be side-effect free apart from its return value.
pub type TxFn = Box<dyn FnMut(Option<&Document>) -> StoreResult<TxOutcome> + Send>;

/// Notification that documents in a collection changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub collection: CollectionPath,
}

/// Abstract transactional document store with live-subscription support
///
/// Contract highlights:
/// - `run_transaction` is a linearizable read-modify-write scoped to one
///   anchor document; the write set commits only if the anchor is unchanged
///   since the read, and contention is retried inside the store, not by the
///   caller.
/// - `batch_write` commits every write or none.
/// - `changes` delivers a notice after every committed mutation; receivers
///   that fall behind may observe lag and must re-query.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomic read-modify-write anchored on one document, committing the
    /// closure's write set in the same atomic unit
    async fn run_transaction(&self, anchor: DocPath, tx: TxFn) -> StoreResult<u64>;

    /// Atomic multi-document write: all documents become visible together
    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> StoreResult<()>;

    /// Read a single document
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    /// Read all documents of a collection (unordered; callers sort)
    async fn query(&self, collection: &CollectionPath) -> StoreResult<Vec<(String, Document)>>;

    /// Subscribe to committed-change notifications
    fn changes(&self) -> broadcast::Receiver<ChangeNotice>;

    /// Lightweight read probe used as a connectivity precondition
    async fn ping(&self) -> StoreResult<()>;

    /// Force a fresh session/connection to the backend
    async fn refresh(&self) -> StoreResult<()>;

    /// Server-side timestamp for record fields
    fn server_time(&self) -> DateTime<Utc>;

    /// Generate a fresh opaque document id
    fn generate_id(&self) -> String;
}
