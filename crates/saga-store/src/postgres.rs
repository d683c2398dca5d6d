use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CorrelationId, JsonSerializer, Result, SagaRecord, SagaSerializer,
    repository::SagaRepository,
};

/// PostgreSQL-backed saga repository.
///
/// One row per correlation ID in the `sagas` table; `save` is an
/// upsert so the previous snapshot is always overwritten wholesale.
#[derive(Clone)]
pub struct PostgresSagaRepository {
    pool: PgPool,
    serializer: Arc<dyn SagaSerializer>,
}

impl PostgresSagaRepository {
    /// Creates a new PostgreSQL saga repository using the JSON serializer.
    pub fn new(pool: PgPool) -> Self {
        Self::with_serializer(pool, Arc::new(JsonSerializer::new()))
    }

    /// Creates a new PostgreSQL saga repository with a custom serializer.
    pub fn with_serializer(pool: PgPool, serializer: Arc<dyn SagaSerializer>) -> Self {
        Self { pool, serializer }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(&self, row: PgRow) -> Result<SagaRecord> {
        let body: String = row.try_get("state")?;
        let state = self.serializer.deserialize(&body)?;

        Ok(SagaRecord {
            correlation_id: CorrelationId::from_uuid(row.try_get::<Uuid, _>("correlation_id")?),
            saga_type: row.try_get("saga_type")?,
            state,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl SagaRepository for PostgresSagaRepository {
    async fn find(&self, correlation_id: CorrelationId) -> Result<Option<SagaRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT correlation_id, saga_type, state, created_at, updated_at
            FROM sagas
            WHERE correlation_id = $1
            "#,
        )
        .bind(correlation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_record(row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: SagaRecord) -> Result<()> {
        let body = self.serializer.serialize(&record.state)?;

        sqlx::query(
            r#"
            INSERT INTO sagas (correlation_id, saga_type, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (correlation_id) DO UPDATE SET
                saga_type = EXCLUDED.saga_type,
                state = EXCLUDED.state,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.correlation_id.as_uuid())
        .bind(&record.saga_type)
        .bind(&body)
        .bind(record.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete(&self, correlation_id: CorrelationId) -> Result<()> {
        // DELETE of an absent row affects zero rows, which keeps
        // completion idempotent without a prior existence check.
        let result = sqlx::query("DELETE FROM sagas WHERE correlation_id = $1")
            .bind(correlation_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(%correlation_id, "complete on absent saga record is a no-op");
        }
        Ok(())
    }
}
