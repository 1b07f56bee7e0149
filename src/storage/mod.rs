//! Device-local persistent storage
//!
//! A simple key-keyed string store in the shape of browser local storage,
//! used only for emergency backup records written when every remote path
//! has failed. No transactions; the kiosk is the only writer on a device.

mod backup;
mod error;
mod keyvalue;

pub use backup::{EmergencyBackupEntry, EmergencyBackupLog, BACKUP_KEY};
pub use error::{StorageError, StorageResult};
pub use keyvalue::{FileStorage, KeyValueStorage, MemoryStorage};
