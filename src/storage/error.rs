//! Local Storage Error Types

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt storage payload under key '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("No usable local storage location")]
    NoStorageLocation,
}

/// Result type for local storage operations
pub type StorageResult<T> = Result<T, StorageError>;
