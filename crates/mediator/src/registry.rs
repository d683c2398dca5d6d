//! Explicit message-type → saga-type registry.
//!
//! The mapping is built once at startup and validated there: a message
//! type may have at most one initiating saga type, and registering a
//! second one is a configuration error. Lookups at dispatch time never
//! scan for capabilities — they hit the two prebuilt namespaces
//! ("initiates" and "consumes") directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::CorrelationId;

use crate::error::{DispatchError, RegistryError};
use crate::message::MessageEnvelope;
use crate::saga::{Saga, SagaData};

/// Result of running a saga handler through the erased boundary.
pub(crate) struct DispatchOutcome {
    /// Correlation ID taken from the saga data after handling.
    pub correlation_id: CorrelationId,
    /// The saga state after the handler ran.
    pub state: serde_json::Value,
    /// Whether the saga marked itself complete.
    pub completed: bool,
}

/// Object-safe adapter over a typed [`Saga`].
///
/// State crosses this boundary as `serde_json::Value`; the adapter owns
/// the conversion to and from the saga's typed data.
#[async_trait]
pub(crate) trait DynSaga: Send + Sync {
    fn saga_type(&self) -> &'static str;

    /// Fresh state for an initiating message, as a JSON value.
    fn initial_state(&self, message: &MessageEnvelope) -> Result<serde_json::Value, DispatchError>;

    /// Decodes the state, runs the typed handler, re-encodes the result.
    async fn dispatch(
        &self,
        message: &MessageEnvelope,
        state: serde_json::Value,
    ) -> Result<DispatchOutcome, DispatchError>;
}

impl std::fmt::Debug for dyn DynSaga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynSaga")
            .field("saga_type", &self.saga_type())
            .finish()
    }
}

struct TypedSaga<S: Saga> {
    inner: S,
}

impl<S: Saga> TypedSaga<S> {
    fn handler_error(error: S::Error) -> DispatchError {
        DispatchError::Handler {
            saga_type: S::saga_type().to_string(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl<S: Saga> DynSaga for TypedSaga<S> {
    fn saga_type(&self) -> &'static str {
        S::saga_type()
    }

    fn initial_state(&self, message: &MessageEnvelope) -> Result<serde_json::Value, DispatchError> {
        let data = self
            .inner
            .initial_data(message)
            .map_err(Self::handler_error)?;
        Ok(serde_json::to_value(&data)?)
    }

    async fn dispatch(
        &self,
        message: &MessageEnvelope,
        state: serde_json::Value,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut data: S::Data = serde_json::from_value(state)?;

        self.inner
            .handle(message, &mut data)
            .await
            .map_err(Self::handler_error)?;

        Ok(DispatchOutcome {
            correlation_id: data.correlation_id(),
            completed: data.is_completed(),
            state: serde_json::to_value(&data)?,
        })
    }
}

/// Immutable saga resolution table, built once at startup.
pub struct SagaRegistry {
    initiators: HashMap<&'static str, Arc<dyn DynSaga>>,
    consumers: HashMap<&'static str, Vec<Arc<dyn DynSaga>>>,
}

impl SagaRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> SagaRegistryBuilder {
        SagaRegistryBuilder::default()
    }

    /// Returns true if some saga type initiates this message type.
    pub fn can_initiate(&self, message_type: &str) -> bool {
        self.initiators.contains_key(message_type)
    }

    /// Returns true if some saga type consumes this message type.
    pub fn can_consume(&self, message_type: &str) -> bool {
        self.consumers.contains_key(message_type)
    }

    /// Resolves the unique initiating saga type for a message type.
    pub(crate) fn initiator_for(
        &self,
        message_type: &str,
    ) -> Result<Arc<dyn DynSaga>, DispatchError> {
        // Uniqueness was enforced at registration, so only absence
        // remains ambiguous here.
        self.initiators.get(message_type).cloned().ok_or_else(|| {
            DispatchError::ResolutionAmbiguous {
                message_type: message_type.to_string(),
                candidates: 0,
            }
        })
    }

    /// Resolves the unique consuming saga type for a message type.
    pub(crate) fn consumer_for(
        &self,
        message_type: &str,
    ) -> Result<Arc<dyn DynSaga>, DispatchError> {
        match self.consumers.get(message_type).map(Vec::as_slice) {
            Some([single]) => Ok(single.clone()),
            Some(candidates) => Err(DispatchError::ResolutionAmbiguous {
                message_type: message_type.to_string(),
                candidates: candidates.len(),
            }),
            None => Err(DispatchError::ResolutionAmbiguous {
                message_type: message_type.to_string(),
                candidates: 0,
            }),
        }
    }
}

/// Builder for [`SagaRegistry`].
#[derive(Default)]
pub struct SagaRegistryBuilder {
    initiators: HashMap<&'static str, Arc<dyn DynSaga>>,
    initiator_types: HashMap<&'static str, &'static str>,
    consumers: HashMap<&'static str, Vec<Arc<dyn DynSaga>>>,
}

impl SagaRegistryBuilder {
    /// Registers a saga type under all its declared message types.
    ///
    /// Fails if another saga type already claims "initiated by" for
    /// one of this saga's initiating message types.
    pub fn register<S: Saga>(mut self, saga: S) -> Result<Self, RegistryError> {
        let entry: Arc<dyn DynSaga> = Arc::new(TypedSaga { inner: saga });

        for message_type in S::initiated_by() {
            if let Some(existing) = self.initiator_types.get(message_type) {
                return Err(RegistryError::DuplicateInitiator {
                    message_type: message_type.to_string(),
                    existing: existing.to_string(),
                    duplicate: S::saga_type().to_string(),
                });
            }
            self.initiator_types.insert(message_type, S::saga_type());
            self.initiators.insert(message_type, entry.clone());
        }

        for message_type in S::consumed_by() {
            self.consumers
                .entry(message_type)
                .or_default()
                .push(entry.clone());
        }

        Ok(self)
    }

    /// Builds the immutable registry.
    pub fn build(self) -> SagaRegistry {
        SagaRegistry {
            initiators: self.initiators,
            consumers: self.consumers,
        }
    }
}
