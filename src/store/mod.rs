//! Abstract transactional document store boundary
//!
//! The queue core talks to its persistent backend exclusively through the
//! [`DocumentStore`] trait: per-document atomic read-modify-write
//! transactions, atomic multi-document batch writes, collection queries,
//! change notifications for live subscriptions, a lightweight connectivity
//! probe and a session refresh hook. The concrete backend is an external
//! collaborator; [`MemoryStore`] is the in-process reference implementation
//! used by the demo binary and the test suite.

mod document;
mod error;
mod memory;
mod traits;

pub use document::{doc_from, CollectionPath, DocPath, Document};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{ChangeNotice, DocumentStore, TxFn, TxOutcome};
