//! Dispatch and configuration error types.

use common::CorrelationId;
use saga_store::SagaStoreError;
use thiserror::Error;

/// Configuration errors raised while building the saga registry.
///
/// These fail fast at startup, before any message is dispatched.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two saga types both claim to initiate the same message type.
    #[error(
        "Message type '{message_type}' is already initiated by saga '{existing}', cannot also register '{duplicate}'"
    )]
    DuplicateInitiator {
        message_type: String,
        existing: String,
        duplicate: String,
    },
}

/// Errors that can occur while dispatching a single message.
///
/// These never escape the mediator as plain errors; they are collected
/// into the [`ConsumeResult`](crate::ConsumeResult) returned to the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry yielded zero or more than one candidate saga type.
    #[error("Message type '{message_type}' resolves to {candidates} saga types, expected exactly one")]
    ResolutionAmbiguous {
        message_type: String,
        candidates: usize,
    },

    /// A consuming message targeted a saga that was never initiated or
    /// has already completed.
    #[error("No saga instance for correlation id {correlation_id} (message type '{message_type}')")]
    SagaNotFound {
        correlation_id: CorrelationId,
        message_type: String,
    },

    /// Saga state could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The saga repository failed.
    #[error("Repository error: {0}")]
    Repository(SagaStoreError),

    /// The saga's business handler failed.
    #[error("Saga '{saga_type}' handler failed: {reason}")]
    Handler { saga_type: String, reason: String },

    /// A pipeline hook vetoed the dispatch before the handler ran.
    #[error("Dispatch aborted by pipeline hook '{hook}': {reason}")]
    PipelineAborted { hook: String, reason: String },
}

// Store-level serialization faults keep their own kind instead of
// being folded into Repository.
impl From<SagaStoreError> for DispatchError {
    fn from(error: SagaStoreError) -> Self {
        match error {
            SagaStoreError::Serialization(e) => DispatchError::Serialization(e),
            other => DispatchError::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_serialization_fault_keeps_its_kind() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let store_error = SagaStoreError::Serialization(json_error);
        assert!(matches!(
            DispatchError::from(store_error),
            DispatchError::Serialization(_)
        ));
    }

    #[test]
    fn store_database_fault_maps_to_repository() {
        let store_error = SagaStoreError::Database(sqlx::Error::PoolClosed);
        assert!(matches!(
            DispatchError::from(store_error),
            DispatchError::Repository(_)
        ));
    }
}
