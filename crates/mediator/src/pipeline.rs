//! Pipeline hooks wrapping every dispatch.
//!
//! Hooks run in registration order before and after each dispatch —
//! the after pass deliberately keeps the same order rather than
//! reversing it. A hook may veto a dispatch from `before_dispatch`;
//! later hooks' `before` then never run, and `after_dispatch` fires
//! only for hooks whose `before` already ran.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CorrelationId;

use crate::message::{MessageEnvelope, MessageId};
use crate::result::ConsumeResult;

/// Per-dispatch context shared with every pipeline hook.
#[derive(Debug)]
pub struct DispatchContext {
    /// The message being dispatched.
    pub message_id: MessageId,

    /// The message type identifier.
    pub message_type: String,

    /// The saga instance the message is addressed to.
    pub correlation_id: CorrelationId,

    /// When the mediator received the message.
    pub received_at: DateTime<Utc>,

    /// Scratch space for hooks; the built-in metadata hook stamps its
    /// bookkeeping here instead of into the saga's business state.
    pub metadata: HashMap<String, serde_json::Value>,

    /// How many hooks entered `before_dispatch`; drives the rule that
    /// `after_dispatch` fires only for hooks whose `before` ran.
    pub(crate) hooks_entered: usize,

    /// Name of the hook that aborted this dispatch, if any.
    pub(crate) aborted_by: Option<String>,
}

impl DispatchContext {
    /// Creates a context for one inbound message.
    pub fn new(message: &MessageEnvelope) -> Self {
        Self {
            message_id: message.message_id,
            message_type: message.message_type.clone(),
            correlation_id: message.correlation_id,
            received_at: Utc::now(),
            metadata: HashMap::new(),
            hooks_entered: 0,
            aborted_by: None,
        }
    }
}

/// Decision returned from a hook's `before_dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Let the dispatch proceed.
    Continue,

    /// Veto the dispatch before the handler runs and before any
    /// repository write for this message.
    Abort { reason: String },
}

impl HookDecision {
    /// Creates an abort decision with a reason.
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
        }
    }
}

/// Cross-cutting interceptor run around every dispatch.
///
/// The same hook instance handles every correlation ID, so hooks must
/// not retain cross-call mutable state unless it is deliberately
/// shared and thread-safe.
#[async_trait]
pub trait PipelineHook: Send + Sync {
    /// Returns the hook name, used in abort errors and logging.
    fn name(&self) -> &str;

    /// Runs before the saga handler. Returning an abort stops the
    /// dispatch before any handler or repository interaction.
    async fn before_dispatch(&self, _context: &mut DispatchContext) -> HookDecision {
        HookDecision::Continue
    }

    /// Runs after persistence with the dispatch outcome, including
    /// aborted and failed outcomes.
    async fn after_dispatch(&self, _context: &mut DispatchContext, _result: &ConsumeResult) {}
}

/// Built-in hook recording timestamps and correlation bookkeeping.
///
/// Always present in the composite chain and not removable through the
/// append-only configuration surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataHook;

#[async_trait]
impl PipelineHook for MetadataHook {
    fn name(&self) -> &str {
        "metadata"
    }

    async fn before_dispatch(&self, context: &mut DispatchContext) -> HookDecision {
        context.metadata.insert(
            "received_at".to_string(),
            serde_json::json!(context.received_at),
        );
        context.metadata.insert(
            "message_id".to_string(),
            serde_json::json!(context.message_id),
        );
        HookDecision::Continue
    }

    async fn after_dispatch(&self, context: &mut DispatchContext, result: &ConsumeResult) {
        let finished_at = Utc::now();
        context
            .metadata
            .insert("finished_at".to_string(), serde_json::json!(finished_at));

        tracing::debug!(
            correlation_id = %context.correlation_id,
            message_type = %context.message_type,
            successful = result.is_successful(),
            elapsed_ms = (finished_at - context.received_at).num_milliseconds(),
            "dispatch finished"
        );
    }
}

/// An ordered chain of hooks behind the single-hook contract.
///
/// Hooks are appended at configuration time and never removed; the
/// metadata hook is seeded at construction so it is present in every
/// chain.
pub struct CompositePipelineHook {
    hooks: Vec<Arc<dyn PipelineHook>>,
}

impl CompositePipelineHook {
    /// Creates a chain containing only the built-in metadata hook.
    pub fn new() -> Self {
        Self {
            hooks: vec![Arc::new(MetadataHook)],
        }
    }

    /// Appends a hook to the end of the chain.
    pub fn append(&mut self, hook: Arc<dyn PipelineHook>) {
        self.hooks.push(hook);
    }

    /// Appends a hook, builder style.
    pub fn with_hook(mut self, hook: Arc<dyn PipelineHook>) -> Self {
        self.append(hook);
        self
    }

    /// Returns the number of hooks in the chain.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if the chain is empty (it never is: the metadata
    /// hook is always present).
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for CompositePipelineHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineHook for CompositePipelineHook {
    fn name(&self) -> &str {
        "composite"
    }

    async fn before_dispatch(&self, context: &mut DispatchContext) -> HookDecision {
        for hook in &self.hooks {
            context.hooks_entered += 1;
            if let HookDecision::Abort { reason } = hook.before_dispatch(context).await {
                context.aborted_by = Some(hook.name().to_string());
                return HookDecision::Abort { reason };
            }
        }
        HookDecision::Continue
    }

    async fn after_dispatch(&self, context: &mut DispatchContext, result: &ConsumeResult) {
        // Same registration order as before_dispatch, limited to the
        // hooks whose before actually ran (the aborting one included).
        let entered = context.hooks_entered;
        for hook in self.hooks.iter().take(entered) {
            hook.after_dispatch(context, result).await;
        }
    }
}
