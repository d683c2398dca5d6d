//! Persistence layer for saga state.
//!
//! A saga repository stores one state snapshot per correlation ID.
//! `find` on an unknown ID is not an error — it signals that no
//! instance exists, which the factory uses to decide between lookup
//! and creation. `save` overwrites the previous snapshot wholesale,
//! and `complete` removes the record idempotently.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod serializer;

pub use common::CorrelationId;
pub use error::{Result, SagaStoreError};
pub use memory::InMemorySagaRepository;
pub use postgres::PostgresSagaRepository;
pub use repository::{SagaRecord, SagaRepository, SagaRepositoryExt};
pub use serializer::{JsonSerializer, SagaSerializer};
