//! Queue Error Types

use crate::core::error_handling::ContextualError;
use crate::queue::PartitionKey;
use crate::storage::StorageError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to allocate queue number for {partition}: {source}")]
    AllocationFailure {
        partition: PartitionKey,
        source: StoreError,
    },

    #[error("Failed to commit queue records: {source}")]
    WriteFailure { source: StoreError },

    #[error("Store connectivity probe failed: {source}")]
    ConnectivityFailure { source: StoreError },

    #[error("Local fallback storage failed: {source}")]
    LocalFallbackFailure { source: StorageError },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, QueueError::LocalFallbackFailure { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            // Both the store and the device fallback failed; nothing was
            // recorded anywhere, so the visitor has to be told to retry.
            QueueError::LocalFallbackFailure { .. } => {
                Some("We could not record your visit. Please try again or ask the front desk for help.")
            }
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
