//! In-memory `DocumentStore` with optimistic-concurrency transactions
//!
//! Versioned documents with an internal contention-retry budget, atomic
//! batch visibility and broadcast change notices. Also carries small fault
//! hooks (offline flag, forced transaction failures) so the submitter's
//! degraded paths can be exercised without a real backend.

use crate::store::traits::{ChangeNotice, DocumentStore, TxFn};
use crate::store::{CollectionPath, DocPath, Document, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Contention retries before the final exclusive pass
const TX_RETRY_BUDGET: usize = 5;

#[derive(Debug, Clone)]
struct VersionedDoc {
    version: u64,
    doc: Document,
}

pub struct MemoryStore {
    docs: RwLock<HashMap<DocPath, VersionedDoc>>,
    change_tx: broadcast::Sender<ChangeNotice>,
    next_version: AtomicU64,
    next_id: AtomicU64,
    contention_retries: AtomicU64,

    // Fault hooks for exercising degraded paths
    offline: AtomicBool,
    heal_on_refresh: AtomicBool,
    fail_transactions: AtomicUsize,
    fail_contention: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self {
            docs: RwLock::new(HashMap::new()),
            change_tx,
            next_version: AtomicU64::new(1),
            next_id: AtomicU64::new(1),
            contention_retries: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            heal_on_refresh: AtomicBool::new(false),
            fail_transactions: AtomicUsize::new(0),
            fail_contention: AtomicUsize::new(0),
        }
    }

    /// Simulate a network partition: every remote operation fails until the
    /// flag is cleared (or `arm_heal_on_refresh` lets `refresh` clear it)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `refresh()` call restore connectivity
    pub fn arm_heal_on_refresh(&self) {
        self.heal_on_refresh.store(true, Ordering::SeqCst);
    }

    /// Fail the next `count` transactions with `Unavailable`
    pub fn fail_next_transactions(&self, count: usize) {
        self.fail_transactions.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` transactions as if the contention-retry budget
    /// ran out (backends with real cross-process contention can abort this
    /// way; the in-memory exclusive final pass never does on its own)
    pub fn fail_next_transactions_with_contention(&self, count: usize) {
        self.fail_contention.store(count, Ordering::SeqCst);
    }

    /// Injected transaction failures not yet consumed
    pub fn injected_failures_remaining(&self) -> usize {
        self.fail_transactions.load(Ordering::SeqCst)
    }

    /// Total contention retries performed across all transactions
    pub fn contention_retries(&self) -> u64 {
        self.contention_retries.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "store is offline".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn bump_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::SeqCst)
    }

    fn notify(&self, writes: &[(DocPath, Document)]) {
        let collections: HashSet<&CollectionPath> =
            writes.iter().map(|(path, _)| &path.collection).collect();
        for collection in collections {
            // Send fails only when nobody is subscribed
            let _ = self.change_tx.send(ChangeNotice {
                collection: collection.clone(),
            });
        }
    }

    fn commit_writes(
        docs: &mut HashMap<DocPath, VersionedDoc>,
        version: u64,
        writes: &[(DocPath, Document)],
    ) {
        for (path, doc) in writes {
            docs.insert(
                path.clone(),
                VersionedDoc {
                    version,
                    doc: doc.clone(),
                },
            );
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn run_transaction(&self, anchor: DocPath, mut tx: TxFn) -> StoreResult<u64> {
        self.check_online()?;

        if self
            .fail_transactions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable {
                reason: "injected transaction failure".to_string(),
            });
        }

        if self
            .fail_contention
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Contention {
                attempts: TX_RETRY_BUDGET,
            });
        }

        // Optimistic passes: read the anchor, run the closure without any
        // lock held, commit only if the anchor version is unchanged.
        for attempt in 0..TX_RETRY_BUDGET {
            let observed = {
                let docs = self.docs.read().unwrap();
                docs.get(&anchor).cloned()
            };
            let observed_version = observed.as_ref().map(|v| v.version);

            let outcome = tx(observed.as_ref().map(|v| &v.doc))?;

            let mut docs = self.docs.write().unwrap();
            let current_version = docs.get(&anchor).map(|v| v.version);
            if current_version == observed_version {
                let version = self.bump_version();
                Self::commit_writes(&mut docs, version, &outcome.writes);
                drop(docs);
                self.notify(&outcome.writes);
                return Ok(outcome.value);
            }

            self.contention_retries.fetch_add(1, Ordering::SeqCst);
            log::trace!(
                "Transaction on {} lost the race (attempt {}/{})",
                anchor,
                attempt + 1,
                TX_RETRY_BUDGET
            );
        }

        // Exclusive final pass: hold the write lock across the whole
        // read-modify-write so it cannot lose another race.
        let mut docs = self.docs.write().unwrap();
        let outcome = tx(docs.get(&anchor).map(|v| &v.doc))?;
        let version = self.bump_version();
        Self::commit_writes(&mut docs, version, &outcome.writes);
        drop(docs);
        self.notify(&outcome.writes);
        Ok(outcome.value)
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> StoreResult<()> {
        self.check_online()?;
        {
            let mut docs = self.docs.write().unwrap();
            let version = self.bump_version();
            Self::commit_writes(&mut docs, version, &writes);
        }
        self.notify(&writes);
        Ok(())
    }

    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.check_online()?;
        let docs = self.docs.read().unwrap();
        Ok(docs.get(path).map(|v| v.doc.clone()))
    }

    async fn query(&self, collection: &CollectionPath) -> StoreResult<Vec<(String, Document)>> {
        self.check_online()?;
        let docs = self.docs.read().unwrap();
        Ok(docs
            .iter()
            .filter(|(path, _)| &path.collection == collection)
            .map(|(path, v)| (path.id.clone(), v.doc.clone()))
            .collect())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.change_tx.subscribe()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn refresh(&self) -> StoreResult<()> {
        if self.heal_on_refresh.swap(false, Ordering::SeqCst) {
            log::debug!("Store session refreshed, connectivity restored");
            self.offline.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn server_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn generate_id(&self) -> String {
        format!("doc-{:08}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}
