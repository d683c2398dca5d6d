//! Shared identifier types for the saga orchestration engine.

pub mod types;

pub use types::CorrelationId;
