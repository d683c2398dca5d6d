use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::CorrelationId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Unique identifier for a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a message ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for typed message payloads.
///
/// A message is bound to exactly one correlation ID when wrapped in a
/// [`MessageEnvelope`]. Whether a message type may create a new saga
/// instance or must target an existing one is declared by the saga
/// types in the registry, not by the message itself.
pub trait Message: Serialize + DeserializeOwned {
    /// Returns the message type identifier used for saga resolution.
    fn message_type() -> &'static str;
}

/// A message along with its routing metadata.
///
/// This is the unit of dispatch: the mediator routes an envelope to the
/// saga instance identified by its correlation ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Unique identifier for this message.
    pub message_id: MessageId,

    /// The type of the message (e.g., "OrderPlaced", "OrderShipped").
    pub message_type: String,

    /// The saga instance this message is addressed to.
    pub correlation_id: CorrelationId,

    /// When the message was created.
    pub timestamp: DateTime<Utc>,

    /// The message payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata about the message.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MessageEnvelope {
    /// Creates an envelope from a typed message.
    pub fn new<M: Message>(
        correlation_id: CorrelationId,
        message: &M,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::builder()
            .message_type(M::message_type())
            .correlation_id(correlation_id)
            .payload(message)?
            .build())
    }

    /// Creates a new message envelope builder.
    pub fn builder() -> MessageEnvelopeBuilder {
        MessageEnvelopeBuilder::default()
    }

    /// Decodes the payload into a typed message.
    pub fn payload_as<M: Message>(&self) -> Result<M, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Builder for constructing message envelopes.
#[derive(Debug, Default)]
pub struct MessageEnvelopeBuilder {
    message_id: Option<MessageId>,
    message_type: Option<String>,
    correlation_id: Option<CorrelationId>,
    timestamp: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
    metadata: HashMap<String, serde_json::Value>,
}

impl MessageEnvelopeBuilder {
    /// Sets the message ID. If not set, a new ID will be generated.
    pub fn message_id(mut self, id: MessageId) -> Self {
        self.message_id = Some(id);
        self
    }

    /// Sets the message type.
    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Builds the message envelope.
    ///
    /// # Panics
    ///
    /// Panics if required fields (message_type, correlation_id, payload)
    /// are not set.
    pub fn build(self) -> MessageEnvelope {
        MessageEnvelope {
            message_id: self.message_id.unwrap_or_default(),
            message_type: self.message_type.expect("message_type is required"),
            correlation_id: self.correlation_id.expect("correlation_id is required"),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: self.payload.expect("payload is required"),
            metadata: self.metadata,
        }
    }

    /// Tries to build the message envelope, returning None if required fields are missing.
    pub fn try_build(self) -> Option<MessageEnvelope> {
        Some(MessageEnvelope {
            message_id: self.message_id.unwrap_or_default(),
            message_type: self.message_type?,
            correlation_id: self.correlation_id?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            payload: self.payload?,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        total_cents: u64,
    }

    impl Message for OrderPlaced {
        fn message_type() -> &'static str {
            "OrderPlaced"
        }
    }

    #[test]
    fn message_id_new_creates_unique_ids() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn envelope_from_typed_message() {
        let correlation_id = CorrelationId::new();
        let message = OrderPlaced { total_cents: 4500 };

        let envelope = MessageEnvelope::new(correlation_id, &message).unwrap();

        assert_eq!(envelope.message_type, "OrderPlaced");
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.payload_as::<OrderPlaced>().unwrap(), message);
    }

    #[test]
    fn envelope_builder() {
        let correlation_id = CorrelationId::new();
        let payload = serde_json::json!({"total_cents": 100});

        let envelope = MessageEnvelope::builder()
            .message_type("OrderPlaced")
            .correlation_id(correlation_id)
            .payload_raw(payload.clone())
            .metadata("source", serde_json::json!("checkout"))
            .build();

        assert_eq!(envelope.message_type, "OrderPlaced");
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.payload, payload);
        assert_eq!(
            envelope.metadata.get("source"),
            Some(&serde_json::json!("checkout"))
        );
    }

    #[test]
    fn envelope_try_build_returns_none_on_missing_fields() {
        let result = MessageEnvelope::builder().try_build();
        assert!(result.is_none());
    }
}
