//! Store Error Types

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Transaction aborted after {attempts} contention retries")]
    Contention { attempts: usize },

    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
