//! Saga instance resolution.

use std::sync::Arc;

use saga_store::SagaRepository;

use crate::error::DispatchError;
use crate::message::MessageEnvelope;
use crate::registry::{DynSaga, SagaRegistry};

/// A resolved saga type paired with the state it should handle.
#[derive(Debug)]
pub struct ResolvedSaga {
    pub(crate) saga: Arc<dyn DynSaga>,
    pub(crate) state: serde_json::Value,
}

/// Resolves inbound messages to saga instances.
///
/// The factory owns the two resolution paths: initiating messages get
/// a fresh instance with new state, consuming messages get the
/// existing instance loaded from the repository.
pub struct SagaFactory<R> {
    registry: Arc<SagaRegistry>,
    repository: Arc<R>,
}

impl<R: SagaRepository> SagaFactory<R> {
    /// Creates a new factory over a registry and repository.
    pub fn new(registry: Arc<SagaRegistry>, repository: Arc<R>) -> Self {
        Self {
            registry,
            repository,
        }
    }

    /// Resolves the saga that initiates this message type and attaches
    /// fresh state built from the message.
    ///
    /// No repository lookup occurs on this path: the message carries
    /// the correlation ID the new instance is born with.
    pub async fn resolve_initiated_by(
        &self,
        message: &MessageEnvelope,
    ) -> Result<ResolvedSaga, DispatchError> {
        let saga = self.registry.initiator_for(&message.message_type)?;
        let state = saga.initial_state(message)?;
        Ok(ResolvedSaga { saga, state })
    }

    /// Resolves the saga that consumes this message type and loads its
    /// persisted state.
    ///
    /// Absence of a record is a distinct failure (the saga was never
    /// initiated, or already completed), never a silent no-op.
    pub async fn resolve_consumed_by(
        &self,
        message: &MessageEnvelope,
    ) -> Result<ResolvedSaga, DispatchError> {
        let saga = self.registry.consumer_for(&message.message_type)?;

        let record = self
            .repository
            .find(message.correlation_id)
            .await?
            .ok_or_else(|| DispatchError::SagaNotFound {
                correlation_id: message.correlation_id,
                message_type: message.message_type.clone(),
            })?;

        Ok(ResolvedSaga {
            saga,
            state: record.state,
        })
    }
}
