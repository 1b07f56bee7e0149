//! Live ordered snapshot fan-out for queue displays
//!
//! Each subscriber gets its own channel of full snapshots, ordered by
//! sequence number ascending: one immediately on subscribe, then a fresh
//! one after every committed change in the partition. Subscribers are
//! independent; there is no shared cursor state. Query or subscription
//! errors degrade to an empty snapshot plus a log line rather than
//! propagating into a display layer.

use crate::queue::{PartitionKey, QueueEntry, QueueResult};
use crate::store::DocumentStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::Notify;

/// Ordered view of one partition's entries
pub type QueueSnapshot = Vec<QueueEntry>;

type Registry = Mutex<HashMap<u64, Arc<Notify>>>;

/// Handle for one live subscription
///
/// `close()` is idempotent and stops all future snapshots; dropping the
/// handle closes it too, so a forgotten display cannot leak its feed task.
pub struct Subscription {
    id: u64,
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so closing before the feed task
            // reaches its select still terminates it.
            self.notify.notify_one();
            if let Some(registry) = self.registry.upgrade() {
                registry.lock().unwrap().remove(&self.id);
            }
            log::debug!("Queue subscription {} closed", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Fans out ordered snapshots of a partition's queue to any number of
/// display consumers
pub struct QueueObserver {
    store: Arc<dyn DocumentStore>,
    registry: Arc<Registry>,
    next_subscription_id: AtomicU64,
}

impl QueueObserver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_subscription_id: AtomicU64::new(0),
        }
    }

    /// Number of subscriptions not yet closed
    pub fn active_subscriptions(&self) -> usize {
        self.registry.lock().unwrap().len()
    }

    /// Close every open subscription (component teardown)
    pub fn close_all(&self) {
        let notifiers: Vec<Arc<Notify>> = {
            let mut registry = self.registry.lock().unwrap();
            registry.drain().map(|(_, n)| n).collect()
        };
        for notify in notifiers {
            notify.notify_one();
        }
    }

    /// Subscribe to live ordered snapshots of one day's queue
    ///
    /// The first snapshot is delivered before this returns; further ones
    /// follow each committed change in the partition.
    pub async fn subscribe(
        &self,
        partition: PartitionKey,
    ) -> QueueResult<(Subscription, UnboundedReceiver<QueueSnapshot>)> {
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded_channel();
        let notify = Arc::new(Notify::new());
        let closed = Arc::new(AtomicBool::new(false));

        self.registry.lock().unwrap().insert(id, notify.clone());

        // Subscribe to changes before the initial snapshot so no commit can
        // fall between them unseen.
        let mut changes = self.store.changes();
        let initial = Self::snapshot(self.store.as_ref(), partition).await;
        // A receiver dropped this early just means nobody is listening yet
        let _ = tx.send(initial);

        let store = Arc::clone(&self.store);
        let registry = Arc::downgrade(&self.registry);
        let entries_collection = partition.entries_collection();
        let task_notify = notify.clone();
        let task_closed = closed.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_notify.notified() => break,
                    change = changes.recv() => match change {
                        Ok(notice) => {
                            if notice.collection != entries_collection {
                                continue;
                            }
                            let snapshot = Self::snapshot(store.as_ref(), partition).await;
                            // close() wins over a change already selected:
                            // nothing is delivered after it returns
                            if task_closed.load(Ordering::SeqCst) || tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!(
                                "Queue subscription {} lagged by {} change notices, resnapshotting",
                                id,
                                skipped
                            );
                            let snapshot = Self::snapshot(store.as_ref(), partition).await;
                            if task_closed.load(Ordering::SeqCst) || tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            task_closed.store(true, Ordering::SeqCst);
            if let Some(registry) = registry.upgrade() {
                registry.lock().unwrap().remove(&id);
            }
            log::debug!("Queue subscription {} feed terminated", id);
        });

        log::debug!("Queue subscription {} opened for {}", id, partition);
        Ok((
            Subscription {
                id,
                closed,
                notify,
                registry: Arc::downgrade(&self.registry),
            },
            rx,
        ))
    }

    async fn snapshot(store: &dyn DocumentStore, partition: PartitionKey) -> QueueSnapshot {
        match store.query(&partition.entries_collection()).await {
            Ok(raw) => {
                let mut entries: Vec<QueueEntry> = raw
                    .into_iter()
                    .filter_map(|(id, doc)| match QueueEntry::from_document(&id, doc) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            log::warn!("Skipping malformed queue entry {}: {}", id, e);
                            None
                        }
                    })
                    .collect();
                entries.sort_by_key(|e| e.sequence_number);
                entries
            }
            Err(e) => {
                // Fail-safe empty state: displays render an empty queue
                // instead of receiving an error.
                log::warn!(
                    "Queue snapshot for {} failed, delivering empty queue: {}",
                    partition,
                    e
                );
                Vec::new()
            }
        }
    }
}
