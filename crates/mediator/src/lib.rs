//! Dispatch engine for long-running processes (sagas).
//!
//! The mediator is the single entry point for inbound messages: each
//! message carries a correlation ID binding it to one saga instance.
//! Saga types declare which message types they initiate and which they
//! consume; an explicit registry built once at startup resolves each
//! message to exactly one saga type. The factory then creates fresh
//! state (initiate) or loads persisted state (consume), the saga's
//! handler runs, and the outcome is persisted — or the record removed
//! when the saga marks itself complete. An ordered pipeline-hook chain
//! wraps every dispatch for cross-cutting behavior.
//!
//! All dispatch faults are converted into a uniform [`ConsumeResult`];
//! callers inspect [`ConsumeResult::is_successful`] instead of catching
//! errors. Only configuration mistakes (two saga types both claiming to
//! initiate the same message type) fail fast at registration.

pub mod error;
pub mod factory;
pub mod mediator;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod saga;

pub use common::CorrelationId;
pub use error::{DispatchError, RegistryError};
pub use factory::SagaFactory;
pub use mediator::{OverlapPolicy, SagaMediator};
pub use message::{Message, MessageEnvelope, MessageEnvelopeBuilder, MessageId};
pub use pipeline::{
    CompositePipelineHook, DispatchContext, HookDecision, MetadataHook, PipelineHook,
};
pub use registry::{SagaRegistry, SagaRegistryBuilder};
pub use result::ConsumeResult;
pub use saga::{Saga, SagaData};
