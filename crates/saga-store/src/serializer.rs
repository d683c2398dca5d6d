//! Serializer contract for persisted saga state.

use crate::Result;

/// Converts saga state to and from its persisted text representation.
///
/// Repositories hold the serializer behind `Arc<dyn SagaSerializer>`,
/// so the format of stored state is an external capability rather than
/// something the engine prescribes. Failures surface as
/// [`SagaStoreError::Serialization`](crate::SagaStoreError::Serialization).
pub trait SagaSerializer: Send + Sync {
    /// Serializes saga state into persistable text.
    fn serialize(&self, state: &serde_json::Value) -> Result<String>;

    /// Deserializes previously persisted text back into saga state.
    ///
    /// Must be the exact inverse of [`serialize`](Self::serialize):
    /// the round trip is lossless field-for-field.
    fn deserialize(&self, text: &str) -> Result<serde_json::Value>;
}

/// JSON serializer for saga state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Creates a new JSON serializer.
    pub fn new() -> Self {
        Self
    }
}

impl SagaSerializer for JsonSerializer {
    fn serialize(&self, state: &serde_json::Value) -> Result<String> {
        Ok(serde_json::to_string(state)?)
    }

    fn deserialize(&self, text: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(text)?)
    }
}
