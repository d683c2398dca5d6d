//! Behavior and state contracts for saga types.

use async_trait::async_trait;
use common::CorrelationId;
use serde::{Serialize, de::DeserializeOwned};

use crate::message::MessageEnvelope;

/// Trait for the mutable state owned by one saga instance.
///
/// The state is created when an initiating message first targets a new
/// correlation ID, mutated only by the saga's own handler, and removed
/// from the repository once [`is_completed`](Self::is_completed)
/// returns true.
pub trait SagaData: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the correlation ID binding this state to its instance.
    fn correlation_id(&self) -> CorrelationId;

    /// Returns true once the long-running process has finished.
    fn is_completed(&self) -> bool;
}

/// Trait for a long-running process type.
///
/// A saga declares which message types it can initiate-handle and
/// which it can consume-handle; the registry resolves inbound messages
/// against those declarations. Handlers signal completion by marking
/// their own data, never by calling the repository directly.
///
/// Registered saga instances are shared across all correlation IDs, so
/// implementations must not keep per-instance mutable state on `self` —
/// everything instance-specific belongs in [`Saga::Data`].
#[async_trait]
pub trait Saga: Send + Sync + 'static {
    /// The state type owned by instances of this process.
    type Data: SagaData;

    /// The type of errors the handlers can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the saga type identifier (e.g., "Order").
    fn saga_type() -> &'static str;

    /// Message types that may create a new instance of this saga.
    fn initiated_by() -> &'static [&'static str] {
        &[]
    }

    /// Message types that must be routed to an existing instance.
    fn consumed_by() -> &'static [&'static str] {
        &[]
    }

    /// Creates fresh state for an initiating message.
    ///
    /// The correlation ID comes from the message; no repository lookup
    /// happens on this path. The handler still runs afterwards with
    /// the fresh state.
    fn initial_data(&self, message: &MessageEnvelope) -> Result<Self::Data, Self::Error>;

    /// Handles one message against the current state.
    ///
    /// On error nothing is persisted — a handler fault never leaves a
    /// partially-mutated snapshot in the repository.
    async fn handle(
        &self,
        message: &MessageEnvelope,
        data: &mut Self::Data,
    ) -> Result<(), Self::Error>;
}
