use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    CorrelationId, JsonSerializer, Result, SagaRecord, SagaSerializer,
    repository::SagaRepository,
};

#[derive(Debug, Clone)]
struct StoredRow {
    saga_type: String,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// In-memory saga repository for testing and development.
///
/// Stores serialized state in a map behind an async lock and provides
/// the same contract as the PostgreSQL implementation, including
/// passing state through the configured serializer.
#[derive(Clone)]
pub struct InMemorySagaRepository {
    serializer: Arc<dyn SagaSerializer>,
    records: Arc<RwLock<HashMap<CorrelationId, StoredRow>>>,
}

impl InMemorySagaRepository {
    /// Creates a new empty repository using the JSON serializer.
    pub fn new() -> Self {
        Self::with_serializer(Arc::new(JsonSerializer::new()))
    }

    /// Creates a new empty repository with a custom serializer.
    pub fn with_serializer(serializer: Arc<dyn SagaSerializer>) -> Self {
        Self {
            serializer,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of stored saga records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if a record exists for the correlation ID.
    pub async fn contains(&self, correlation_id: CorrelationId) -> bool {
        self.records.read().await.contains_key(&correlation_id)
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

impl Default for InMemorySagaRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SagaRepository for InMemorySagaRepository {
    async fn find(&self, correlation_id: CorrelationId) -> Result<Option<SagaRecord>> {
        let records = self.records.read().await;
        match records.get(&correlation_id) {
            Some(row) => {
                let state = self.serializer.deserialize(&row.body)?;
                Ok(Some(SagaRecord {
                    correlation_id,
                    saga_type: row.saga_type.clone(),
                    state,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: SagaRecord) -> Result<()> {
        let body = self.serializer.serialize(&record.state)?;
        let mut records = self.records.write().await;

        // Wholesale overwrite; only created_at survives from a previous row.
        let created_at = records
            .get(&record.correlation_id)
            .map(|existing| existing.created_at)
            .unwrap_or(record.created_at);

        records.insert(
            record.correlation_id,
            StoredRow {
                saga_type: record.saga_type,
                body,
                created_at,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn complete(&self, correlation_id: CorrelationId) -> Result<()> {
        let mut records = self.records.write().await;
        if records.remove(&correlation_id).is_none() {
            tracing::debug!(%correlation_id, "complete on absent saga record is a no-op");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SagaRepositoryExt;

    fn sample_record(correlation_id: CorrelationId) -> SagaRecord {
        SagaRecord::new(
            correlation_id,
            "Order",
            serde_json::json!({"status": "placed", "completed": false}),
        )
    }

    #[tokio::test]
    async fn find_unknown_id_is_none_not_error() {
        let repo = InMemorySagaRepository::new();
        let found = repo.find(CorrelationId::new()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_then_find_roundtrips_state() {
        let repo = InMemorySagaRepository::new();
        let correlation_id = CorrelationId::new();
        let record = sample_record(correlation_id);

        repo.save(record.clone()).await.unwrap();

        let found = repo.find(correlation_id).await.unwrap().unwrap();
        assert_eq!(found.correlation_id, correlation_id);
        assert_eq!(found.saga_type, "Order");
        assert_eq!(found.state, record.state);
        assert_eq!(repo.record_count().await, 1);
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot_wholesale() {
        let repo = InMemorySagaRepository::new();
        let correlation_id = CorrelationId::new();

        repo.save(sample_record(correlation_id)).await.unwrap();

        let first = repo.find(correlation_id).await.unwrap().unwrap();

        let mut updated = sample_record(correlation_id);
        updated.state = serde_json::json!({"status": "shipped", "completed": false});
        repo.save(updated).await.unwrap();

        let found = repo.find(correlation_id).await.unwrap().unwrap();
        assert_eq!(found.state["status"], "shipped");
        // No trace of the old snapshot, but creation time is preserved.
        assert_eq!(found.created_at, first.created_at);
        assert_eq!(repo.record_count().await, 1);
    }

    #[tokio::test]
    async fn complete_removes_record() {
        let repo = InMemorySagaRepository::new();
        let correlation_id = CorrelationId::new();

        repo.save(sample_record(correlation_id)).await.unwrap();
        assert!(repo.exists(correlation_id).await.unwrap());

        repo.complete(correlation_id).await.unwrap();
        assert!(!repo.exists(correlation_id).await.unwrap());
        assert_eq!(repo.record_count().await, 0);
    }

    #[tokio::test]
    async fn complete_twice_is_idempotent() {
        let repo = InMemorySagaRepository::new();
        let correlation_id = CorrelationId::new();

        repo.save(sample_record(correlation_id)).await.unwrap();
        repo.complete(correlation_id).await.unwrap();
        repo.complete(correlation_id).await.unwrap();

        assert_eq!(repo.record_count().await, 0);
    }

    #[tokio::test]
    async fn complete_on_never_initiated_id_is_noop() {
        let repo = InMemorySagaRepository::new();
        repo.complete(CorrelationId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn records_for_different_ids_are_independent() {
        let repo = InMemorySagaRepository::new();
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        repo.save(sample_record(id1)).await.unwrap();
        repo.save(sample_record(id2)).await.unwrap();
        assert_eq!(repo.record_count().await, 2);

        repo.complete(id1).await.unwrap();
        assert!(!repo.contains(id1).await);
        assert!(repo.contains(id2).await);
    }
}
