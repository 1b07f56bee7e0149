//! Emergency backup log for submissions that could not reach the store
//!
//! Entries are appended when every remote write path has failed and are
//! meant to be drained by a later sync pass. They never carry a
//! server-assigned sequence number; the visitor's place in line is recorded
//! somewhere, not yet server-visible.

use crate::storage::{KeyValueStorage, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Storage key holding the backup array
pub const BACKUP_KEY: &str = "emergency_submissions";

/// One locally-captured submission awaiting sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyBackupEntry {
    pub local_id: String,
    pub captured_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub synced: bool,
}

/// Append-oriented view over the backup array in local storage
pub struct EmergencyBackupLog {
    storage: Arc<dyn KeyValueStorage>,
    // Disambiguates ids captured within the same millisecond
    counter: AtomicU64,
}

impl EmergencyBackupLog {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            counter: AtomicU64::new(0),
        }
    }

    fn read_all(&self) -> StorageResult<Vec<EmergencyBackupEntry>> {
        match self.storage.get(BACKUP_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: BACKUP_KEY.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn write_all(&self, entries: &[EmergencyBackupEntry]) -> StorageResult<()> {
        let raw = serde_json::to_string(entries).expect("backup entries always serialize");
        self.storage.set(BACKUP_KEY, &raw)
    }

    /// Append an unsynced backup entry, returning its local id
    pub fn append(
        &self,
        payload: serde_json::Value,
        captured_at: DateTime<Utc>,
    ) -> StorageResult<String> {
        let local_id = format!(
            "backup-{}-{}",
            captured_at.timestamp_millis(),
            self.counter.fetch_add(1, Ordering::SeqCst)
        );

        let mut entries = self.read_all()?;
        entries.push(EmergencyBackupEntry {
            local_id: local_id.clone(),
            captured_at,
            payload,
            synced: false,
        });
        self.write_all(&entries)?;

        log::warn!(
            "Submission captured to local backup '{}' ({} pending)",
            local_id,
            entries.iter().filter(|e| !e.synced).count()
        );
        Ok(local_id)
    }

    /// All entries not yet synced to the store
    pub fn pending(&self) -> StorageResult<Vec<EmergencyBackupEntry>> {
        Ok(self.read_all()?.into_iter().filter(|e| !e.synced).collect())
    }

    /// Mark one entry as synced; unknown ids are ignored
    pub fn mark_synced(&self, local_id: &str) -> StorageResult<()> {
        let mut entries = self.read_all()?;
        for entry in entries.iter_mut() {
            if entry.local_id == local_id {
                entry.synced = true;
            }
        }
        self.write_all(&entries)
    }
}
