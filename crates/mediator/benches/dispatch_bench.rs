use async_trait::async_trait;
use common::CorrelationId;
use criterion::{Criterion, criterion_group, criterion_main};
use mediator::{
    DispatchContext, HookDecision, MessageEnvelope, PipelineHook, Saga, SagaData, SagaMediator,
    SagaRegistry,
};
use saga_store::InMemorySagaRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchData {
    correlation_id: CorrelationId,
    ticks: u32,
    completed: bool,
}

impl SagaData for BenchData {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BenchError(String);

struct TickSaga;

#[async_trait]
impl Saga for TickSaga {
    type Data = BenchData;
    type Error = BenchError;

    fn saga_type() -> &'static str {
        "Tick"
    }

    fn initiated_by() -> &'static [&'static str] {
        &["TickStarted"]
    }

    fn consumed_by() -> &'static [&'static str] {
        &["Ticked", "TickFinished"]
    }

    fn initial_data(&self, message: &MessageEnvelope) -> Result<Self::Data, Self::Error> {
        Ok(BenchData {
            correlation_id: message.correlation_id,
            ticks: 0,
            completed: false,
        })
    }

    async fn handle(
        &self,
        message: &MessageEnvelope,
        data: &mut Self::Data,
    ) -> Result<(), Self::Error> {
        match message.message_type.as_str() {
            "TickStarted" => Ok(()),
            "Ticked" => {
                data.ticks += 1;
                Ok(())
            }
            "TickFinished" => {
                data.completed = true;
                Ok(())
            }
            other => Err(BenchError(format!("unexpected message '{other}'"))),
        }
    }
}

struct NoopHook;

#[async_trait]
impl PipelineHook for NoopHook {
    fn name(&self) -> &str {
        "noop"
    }

    async fn before_dispatch(&self, _context: &mut DispatchContext) -> HookDecision {
        HookDecision::Continue
    }
}

fn make_mediator() -> SagaMediator<InMemorySagaRepository> {
    let registry = SagaRegistry::builder().register(TickSaga).unwrap().build();
    SagaMediator::new(registry, InMemorySagaRepository::new())
}

fn envelope(message_type: &str, correlation_id: CorrelationId) -> MessageEnvelope {
    MessageEnvelope::builder()
        .message_type(message_type)
        .correlation_id(correlation_id)
        .payload_raw(serde_json::json!({}))
        .build()
}

fn bench_initiate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = make_mediator();

    c.bench_function("mediator/initiate", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = mediator
                    .consume(envelope("TickStarted", CorrelationId::new()))
                    .await;
                assert!(result.is_successful());
            });
        });
    });
}

fn bench_consume_existing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = make_mediator();
    let correlation_id = CorrelationId::new();
    rt.block_on(async {
        mediator
            .consume(envelope("TickStarted", correlation_id))
            .await;
    });

    c.bench_function("mediator/consume_existing", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = mediator.consume(envelope("Ticked", correlation_id)).await;
                assert!(result.is_successful());
            });
        });
    });
}

fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = make_mediator();

    c.bench_function("mediator/initiate_tick_complete", |b| {
        b.iter(|| {
            rt.block_on(async {
                let correlation_id = CorrelationId::new();
                mediator
                    .consume(envelope("TickStarted", correlation_id))
                    .await;
                mediator.consume(envelope("Ticked", correlation_id)).await;
                let result = mediator
                    .consume(envelope("TickFinished", correlation_id))
                    .await;
                assert!(result.is_completed());
            });
        });
    });
}

fn bench_consume_with_hooks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = SagaRegistry::builder().register(TickSaga).unwrap().build();
    let mediator = SagaMediator::new(registry, InMemorySagaRepository::new())
        .with_hook(Arc::new(NoopHook))
        .with_hook(Arc::new(NoopHook))
        .with_hook(Arc::new(NoopHook));
    let correlation_id = CorrelationId::new();
    rt.block_on(async {
        mediator
            .consume(envelope("TickStarted", correlation_id))
            .await;
    });

    c.bench_function("mediator/consume_with_3_hooks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = mediator.consume(envelope("Ticked", correlation_id)).await;
                assert!(result.is_successful());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_initiate,
    bench_consume_existing,
    bench_full_lifecycle,
    bench_consume_with_hooks,
);
criterion_main!(benches);
