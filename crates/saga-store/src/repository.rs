use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CorrelationId, Result};

/// A persisted snapshot of one saga instance's state.
///
/// The `state` payload is owned exclusively by the saga's handlers; the
/// repository treats it as opaque. At most one record exists per
/// correlation ID at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaRecord {
    /// The saga instance this snapshot belongs to.
    pub correlation_id: CorrelationId,

    /// Identifier of the process type (e.g., "Order").
    pub saga_type: String,

    /// The saga's business state, including its completion flag.
    pub state: serde_json::Value,

    /// When the first snapshot for this correlation ID was saved.
    pub created_at: DateTime<Utc>,

    /// When this snapshot was saved.
    pub updated_at: DateTime<Utc>,
}

impl SagaRecord {
    /// Creates a new record stamped with the current time.
    pub fn new(
        correlation_id: CorrelationId,
        saga_type: impl Into<String>,
        state: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            correlation_id,
            saga_type: saga_type.into(),
            state,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Core trait for saga repositories.
///
/// A repository is a durable store keyed by correlation ID. It is
/// polymorphic over the backing store — in-memory for tests and
/// development, PostgreSQL for production — and callers depend only on
/// this contract. All implementations must be thread-safe.
#[async_trait]
pub trait SagaRepository: Send + Sync {
    /// Finds the saga record for a correlation ID.
    ///
    /// An unknown ID is not an error: `Ok(None)` signals that no
    /// instance exists, which the factory uses to decide between
    /// lookup and creation.
    async fn find(&self, correlation_id: CorrelationId) -> Result<Option<SagaRecord>>;

    /// Saves a snapshot, overwriting any previous one wholesale.
    ///
    /// There is no partial or field-level update; the stored state is
    /// replaced entirely. `created_at` of an existing record is
    /// preserved, `updated_at` is refreshed.
    async fn save(&self, record: SagaRecord) -> Result<()>;

    /// Removes the record for a completed saga.
    ///
    /// Idempotent: completing an already-absent ID is a no-op, not a
    /// failure.
    async fn complete(&self, correlation_id: CorrelationId) -> Result<()>;
}

/// Extension trait providing convenience methods for saga repositories.
#[async_trait]
pub trait SagaRepositoryExt: SagaRepository {
    /// Checks whether a saga instance exists for a correlation ID.
    async fn exists(&self, correlation_id: CorrelationId) -> Result<bool> {
        Ok(self.find(correlation_id).await?.is_some())
    }
}

// Blanket implementation for all SagaRepository implementations
impl<T: SagaRepository + ?Sized> SagaRepositoryExt for T {}
