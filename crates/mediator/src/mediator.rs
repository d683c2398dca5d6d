//! The mediator: single entry point for inbound messages.

use std::collections::HashMap;
use std::sync::Arc;

use common::CorrelationId;
use saga_store::{SagaRecord, SagaRepository, SagaRepositoryExt};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::DispatchError;
use crate::factory::SagaFactory;
use crate::message::MessageEnvelope;
use crate::pipeline::{CompositePipelineHook, DispatchContext, HookDecision, PipelineHook};
use crate::registry::{DispatchOutcome, SagaRegistry};
use crate::result::ConsumeResult;

/// Policy for message types that both initiate and consume.
///
/// The initiating and consuming namespaces are not mutually exclusive;
/// when a message type appears in both, this policy decides the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Check the repository first: an existing record routes the
    /// message down the consume path, absence down the initiate path.
    #[default]
    CheckExistence,

    /// Always treat the message as consuming; an unknown correlation
    /// ID fails with `SagaNotFound`.
    ConsumeOnly,
}

/// Dispatches inbound messages to saga instances.
///
/// Each `consume` call is one unit of work: pre-hooks, resolution,
/// handler execution, persistence, post-hooks. Calls for different
/// correlation IDs may run concurrently; calls for the same
/// correlation ID are serialized by a keyed lock so the
/// load→execute→save sequence never interleaves.
pub struct SagaMediator<R: SagaRepository> {
    registry: Arc<SagaRegistry>,
    repository: Arc<R>,
    factory: SagaFactory<R>,
    pipeline: CompositePipelineHook,
    overlap_policy: OverlapPolicy,
    locks: Mutex<HashMap<CorrelationId, Arc<Mutex<()>>>>,
}

impl<R: SagaRepository> SagaMediator<R> {
    /// Creates a mediator over a registry and repository.
    ///
    /// The pipeline starts with the built-in metadata hook; further
    /// hooks are appended with [`with_hook`](Self::with_hook).
    pub fn new(registry: SagaRegistry, repository: R) -> Self {
        let registry = Arc::new(registry);
        let repository = Arc::new(repository);
        Self {
            factory: SagaFactory::new(registry.clone(), repository.clone()),
            registry,
            repository,
            pipeline: CompositePipelineHook::new(),
            overlap_policy: OverlapPolicy::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a pipeline hook, builder style.
    pub fn with_hook(mut self, hook: Arc<dyn PipelineHook>) -> Self {
        self.pipeline.append(hook);
        self
    }

    /// Sets the policy for message types that both initiate and consume.
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Consumes one inbound message.
    ///
    /// All dispatch faults are converted into an unsuccessful
    /// [`ConsumeResult`]; this method never returns an error.
    #[tracing::instrument(
        skip(self, message),
        fields(message_type = %message.message_type, correlation_id = %message.correlation_id)
    )]
    pub async fn consume(&self, message: MessageEnvelope) -> ConsumeResult {
        metrics::counter!("saga_messages_consumed_total").increment(1);
        let started = std::time::Instant::now();
        let mut context = DispatchContext::new(&message);

        if let HookDecision::Abort { reason } = self.pipeline.before_dispatch(&mut context).await {
            let hook = context
                .aborted_by
                .clone()
                .unwrap_or_else(|| "pipeline".to_string());
            tracing::warn!(hook = %hook, %reason, "dispatch aborted by pipeline hook");
            metrics::counter!("saga_dispatches_aborted_total").increment(1);

            let result = ConsumeResult::failure(
                message.correlation_id,
                DispatchError::PipelineAborted { hook, reason },
            );
            self.pipeline.after_dispatch(&mut context, &result).await;
            return result;
        }

        let guard = self.lock_for(message.correlation_id).await;
        let outcome = self.dispatch(&message).await;
        drop(guard);
        self.release_lock(message.correlation_id).await;

        let result = match outcome {
            Ok(outcome) => {
                if outcome.completed {
                    metrics::counter!("saga_completions_total").increment(1);
                }
                ConsumeResult::success(outcome.correlation_id, outcome.state, outcome.completed)
            }
            Err(error) => {
                metrics::counter!("saga_dispatch_failures_total").increment(1);
                tracing::warn!(%error, "dispatch failed");
                ConsumeResult::failure(message.correlation_id, error)
            }
        };

        self.pipeline.after_dispatch(&mut context, &result).await;
        metrics::histogram!("saga_dispatch_duration_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    /// Resolution, handler execution, and persistence for one message.
    async fn dispatch(&self, message: &MessageEnvelope) -> Result<DispatchOutcome, DispatchError> {
        let message_type = message.message_type.as_str();
        let initiates = self.registry.can_initiate(message_type);
        let consumes = self.registry.can_consume(message_type);

        let resolved = if initiates && consumes {
            match self.overlap_policy {
                OverlapPolicy::CheckExistence => {
                    if self.repository.exists(message.correlation_id).await? {
                        self.factory.resolve_consumed_by(message).await?
                    } else {
                        self.factory.resolve_initiated_by(message).await?
                    }
                }
                OverlapPolicy::ConsumeOnly => self.factory.resolve_consumed_by(message).await?,
            }
        } else if initiates {
            self.factory.resolve_initiated_by(message).await?
        } else {
            self.factory.resolve_consumed_by(message).await?
        };

        let saga_type = resolved.saga.saga_type();
        let outcome = resolved.saga.dispatch(message, resolved.state).await?;

        // Persistence only happens after the handler returned Ok; a
        // handler fault never reaches this point.
        if outcome.completed {
            self.repository.complete(outcome.correlation_id).await?;
            tracing::info!(saga_type, correlation_id = %outcome.correlation_id, "saga completed");
        } else {
            let record =
                SagaRecord::new(outcome.correlation_id, saga_type, outcome.state.clone());
            self.repository.save(record).await?;
        }

        Ok(outcome)
    }

    /// Acquires the per-correlation-id lock, creating it on first use.
    async fn lock_for(&self, correlation_id: CorrelationId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(correlation_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Drops the lock entry when no other call is holding or awaiting it.
    async fn release_lock(&self, correlation_id: CorrelationId) {
        let mut locks = self.locks.lock().await;
        if let Some(entry) = locks.get(&correlation_id)
            && Arc::strong_count(entry) == 1
        {
            locks.remove(&correlation_id);
        }
    }
}
